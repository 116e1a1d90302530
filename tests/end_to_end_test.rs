//! Full runs of the page pipeline over the local rendering host

mod common;

use std::io::{Cursor, Write};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use common::{fast_policy, page_widths, params, sample_artifacts, write_template};
use matchdoc::config::{PagesConfig, Settings};
use matchdoc::host::{LocalHost, MockHost};
use matchdoc::pipeline::TemplateSource;
use matchdoc::{ErrorCode, ReportGenerator, ReportRequest};

const PAGES: &str = r#"
pages:
  - name: Set pieces
    template: page3.yaml
    pipeline: [replace_header, replace_text]
    replacements:
      - { find: "page3", with: "${rival} (${venue})" }
  - template: page4.yaml
    pipeline: [replace_header]
  - template: page1.yaml
    pipeline: [replace_header]
  - template: page2.yaml
    pipeline: [replace_header, rotate_page]
"#;

fn pages() -> PagesConfig {
    serde_yaml::from_str(PAGES).unwrap()
}

fn settings() -> Settings {
    Settings {
        host_retry: fast_policy(),
        ..Settings::default()
    }
}

fn template_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "page1.yaml", 700.0);
    write_template(dir.path(), "page2.yaml", 500.0);
    write_template(dir.path(), "page3.yaml", 600.0);
    dir
}

fn request(dir: &TempDir) -> ReportRequest {
    ReportRequest::new(params(10), TemplateSource::Directory(dir.path().into()))
        .with_headers("Matchday 3 | CHA (A)", "Matchday 3 | 2025-08-23 15:00 h | The Valley")
}

#[tokio::test]
async fn test_missing_template_is_reported_and_order_kept() {
    let dir = template_dir();
    let generator =
        ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages(), &settings());

    let report = generator
        .generate(&request(&dir), &sample_artifacts("Alpha FC"))
        .await
        .unwrap();

    assert_eq!(report.pages, vec!["Set pieces", "page1.yaml", "page2.yaml"]);
    assert_eq!(report.missing_templates, vec!["page4.yaml"]);
    assert!(report.failed_pages.is_empty());
    assert_eq!(page_widths(&report.pdf), vec![600.0, 700.0, 500.0]);
}

#[tokio::test]
async fn test_templates_from_zip_archive() {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        for (name, width) in [("nested/page1.yaml", 700.0), ("page2.yaml", 500.0), ("page3.yaml", 600.0)] {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer
                .write_all(common::template(width, name).as_bytes())
                .unwrap();
        }
        writer.finish().unwrap();
    }

    let generator =
        ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages(), &settings());
    let request = ReportRequest::new(params(10), TemplateSource::Archive(buffer.into_inner()))
        .with_headers("Matchday 3 | CHA (A)", "");

    let report = generator
        .generate(&request, &sample_artifacts("Alpha FC"))
        .await
        .unwrap();
    assert_eq!(page_widths(&report.pdf), vec![600.0, 700.0, 500.0]);
}

#[tokio::test]
async fn test_page_configuration_error_drops_only_that_page() {
    let dir = template_dir();
    let pages: PagesConfig = serde_yaml::from_str(
        r#"
pages:
  - template: page1.yaml
    pipeline: [replace_header, insert_badge]
    badge: { width_cm: 2.0 }
  - template: page2.yaml
    pipeline: [replace_header]
"#,
    )
    .unwrap();
    let generator = ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages, &settings());

    let report = generator
        .generate(&request(&dir), &sample_artifacts("Alpha FC"))
        .await
        .unwrap();
    assert_eq!(report.pages, vec!["page2.yaml"]);
    assert_eq!(report.failed_pages, vec!["page1.yaml"]);
    assert_eq!(page_widths(&report.pdf), vec![500.0]);
}

#[tokio::test]
async fn test_no_page_produced_is_an_error() {
    let dir = TempDir::new().unwrap();
    let generator =
        ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages(), &settings());

    let err = generator
        .generate(&request(&dir), &sample_artifacts("Alpha FC"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TEMPLATE_NO_PAGES);
    assert!(err.to_string().contains("page4.yaml"));
}

#[tokio::test]
async fn test_busy_host_aborts_run_and_still_quits() {
    let dir = template_dir();
    let host = Arc::new(MockHost::new());
    host.reject_busy("export_pdf", 12).await;
    let generator = ReportGenerator::with_settings(host.clone(), pages(), &settings());

    let err = generator
        .generate(&request(&dir), &sample_artifacts("Alpha FC"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::HOST_RETRIES_EXHAUSTED);
    assert!(err.aborts_run());
    assert_eq!(host.quit_count(), 1);

    let calls = host.get_called_operations().await;
    assert_eq!(calls.iter().filter(|op| *op == "export_pdf").count(), 12);
    // The open document is closed before the run unwinds
    assert!(calls.contains(&"close".to_string()));
}

#[tokio::test]
async fn test_busy_host_recovers_within_bound() {
    let dir = template_dir();
    let host = Arc::new(MockHost::new());
    host.reject_busy("open", 11).await;
    let generator = ReportGenerator::with_settings(host.clone(), pages(), &settings());

    let report = generator
        .generate(&request(&dir), &sample_artifacts("Alpha FC"))
        .await
        .unwrap();
    assert_eq!(report.pages.len(), 3);
    assert_eq!(host.pump_count(), 11);
    assert_eq!(host.quit_count(), 1);
}

#[tokio::test]
async fn test_three_page_run_with_one_missing_template() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "p1.yaml", 700.0);
    write_template(dir.path(), "p3.yaml", 600.0);
    let pages: PagesConfig = serde_yaml::from_str(
        "pages:\n  - template: p3.yaml\n    pipeline: [replace_header]\n  - template: p1.yaml\n    pipeline: [replace_header]\n  - template: p2.yaml\n    pipeline: [replace_header]\n",
    )
    .unwrap();
    let params = matchdoc::ParameterSet::new(
        "A",
        "B",
        "league",
        matchdoc::Field::Home,
        "2024-2025",
        10,
    )
    .unwrap();
    let request = ReportRequest::new(params, TemplateSource::Directory(dir.path().into()))
        .with_headers("Matchday 1 | B (H)", "");
    let generator = ReportGenerator::with_settings(Arc::new(LocalHost::new()), pages, &settings());

    let report = generator
        .generate(&request, &sample_artifacts("A"))
        .await
        .unwrap();

    assert_eq!(page_widths(&report.pdf), vec![600.0, 700.0]);
    assert_eq!(report.missing_templates, vec!["p2.yaml"]);
}
