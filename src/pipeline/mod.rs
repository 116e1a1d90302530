//! Page pipeline executor
//!
//! [`ReportGenerator::generate`] walks the configured pages in order. Each
//! page is opened from the template source, its operations run in
//! configuration order through the retrying [`AutomationClient`], and the
//! result is exported to a single-page PDF. The exported pages are merged
//! into the final document.
//!
//! Failure scoping:
//! - a template absent from the source is recorded as missing;
//! - a page configuration error, or a host failure while opening or
//!   exporting, drops that page only;
//! - other host failures inside an operation are logged and the page goes on;
//! - a host that stays busy through every retry aborts the run.
//!
//! The scratch directory is removed and the host session is quit on every
//! exit path.

mod operations;
pub mod templates;
pub mod text;

pub use templates::{find_template, TemplateSource};
pub use text::Variables;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::builders::fixtures::FixtureRow;
use crate::cache::ArtifactSet;
use crate::config::{PageConfig, PagesConfig, Settings, DEFAULT_HEADER_PLACEHOLDER};
use crate::error::{ReportError, Result};
use crate::host::{AutomationClient, HostDocument, RenderingHost};
use crate::images::{ImageBuilderRegistry, ImageContext};
use crate::merge::merge_pdfs;
use crate::params::ParameterSet;
use crate::reconcile::NumberFormat;

/// Header lines for the upcoming match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHeader {
    pub matchday: u32,
    /// Short code of the rival, e.g. `CHA`
    pub rival_code: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`; anything after the minutes is ignored
    pub time: String,
    pub venue: String,
}

impl MatchHeader {
    /// `Matchday 7 | CHA (A)`
    pub fn short(&self, params: &ParameterSet) -> String {
        format!(
            "Matchday {} | {} ({})",
            self.matchday,
            self.rival_code,
            params.field().code()
        )
    }

    /// `Matchday 7 | 2025-08-09 13:30 h | The Valley`
    pub fn full(&self) -> String {
        let time: String = self.time.trim().chars().take(5).collect();
        format!(
            "Matchday {} | {} {} h | {}",
            self.matchday,
            self.date.trim(),
            time,
            self.venue
        )
    }
}

/// Everything a run needs besides the cached datasets
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub params: ParameterSet,
    pub templates: TemplateSource,
    /// Replaces the header placeholder
    pub header: String,
    /// Long header, available to replacements as `${header_full}`
    pub header_full: String,
    /// Chronological index of the upcoming fixture within the season
    pub fixture_index: Option<u32>,
    /// Most recent fixtures of the rival, newest first
    pub fixtures: Vec<FixtureRow>,
    pub rival_badge: Option<Vec<u8>>,
    pub base_badge: Option<Vec<u8>>,
}

impl ReportRequest {
    pub fn new(params: ParameterSet, templates: TemplateSource) -> Self {
        Self {
            params,
            templates,
            header: String::new(),
            header_full: String::new(),
            fixture_index: None,
            fixtures: Vec::new(),
            rival_badge: None,
            base_badge: None,
        }
    }

    pub fn with_match_header(mut self, header: &MatchHeader) -> Self {
        self.header = header.short(&self.params);
        self.header_full = header.full();
        self
    }

    pub fn with_headers(mut self, header: impl Into<String>, header_full: impl Into<String>) -> Self {
        self.header = header.into();
        self.header_full = header_full.into();
        self
    }
}

/// The merged document plus what happened to each page
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub pdf: Vec<u8>,
    /// Display names of the merged pages, in order
    pub pages: Vec<String>,
    pub missing_templates: Vec<String>,
    pub failed_pages: Vec<String>,
}

/// State shared by the pages of one run
struct RunContext<'a> {
    request: &'a ReportRequest,
    artifacts: &'a ArtifactSet,
    variables: Variables,
    images: ImageContext,
    pdf_dir: PathBuf,
}

#[derive(Default)]
struct PageOutcomes {
    created: Vec<(String, PathBuf)>,
    missing: Vec<String>,
    failed: Vec<String>,
}

pub struct ReportGenerator {
    client: AutomationClient,
    pages: PagesConfig,
    images: ImageBuilderRegistry,
    format: NumberFormat,
    header_placeholder: String,
    team_color: String,
    rival_color: String,
}

impl ReportGenerator {
    pub fn new(host: Arc<dyn RenderingHost>, pages: PagesConfig) -> Self {
        Self::with_settings(host, pages, &Settings::default())
    }

    pub fn with_settings(host: Arc<dyn RenderingHost>, pages: PagesConfig, settings: &Settings) -> Self {
        let mut images = ImageBuilderRegistry::with_defaults();
        images.register_commands(&settings.image_commands);
        Self {
            client: AutomationClient::with_policy(host, settings.host_retry.clone()),
            pages,
            images,
            format: NumberFormat::with_separator(settings.decimal_separator),
            header_placeholder: settings.header_placeholder.clone(),
            team_color: settings.highlight_team_color.clone(),
            rival_color: settings.highlight_rival_color.clone(),
        }
    }

    pub fn with_images(mut self, images: ImageBuilderRegistry) -> Self {
        self.images = images;
        self
    }

    pub fn client(&self) -> &AutomationClient {
        &self.client
    }

    pub fn pages(&self) -> &PagesConfig {
        &self.pages
    }

    /// Produce the merged report for `request` from the resolved datasets
    pub async fn generate(
        &self,
        request: &ReportRequest,
        artifacts: &ArtifactSet,
    ) -> Result<GeneratedReport> {
        let workdir = tempfile::Builder::new().prefix("matchdoc_").tempdir()?;
        info!(
            "Generating {} pages for {} vs {}",
            self.pages.pages.len(),
            request.params.team(),
            request.params.rival()
        );

        let outcome = self.run(request, artifacts, workdir.path()).await;
        if let Err(e) = self.client.quit().await {
            warn!("Rendering host did not quit cleanly: {}", e);
        }
        let outcome = outcome?;

        if outcome.created.is_empty() {
            return Err(ReportError::no_pages(outcome.missing, outcome.failed));
        }

        let (names, paths): (Vec<String>, Vec<PathBuf>) = outcome.created.into_iter().unzip();
        let pdf = tokio::task::spawn_blocking(move || merge_pdfs(&paths))
            .await
            .map_err(|e| ReportError::other(format!("merge task panicked: {}", e)))??;
        info!("Report assembled: {} pages, {} bytes", names.len(), pdf.len());

        Ok(GeneratedReport {
            pdf,
            pages: names,
            missing_templates: outcome.missing,
            failed_pages: outcome.failed,
        })
    }

    async fn run(
        &self,
        request: &ReportRequest,
        artifacts: &ArtifactSet,
        workdir: &Path,
    ) -> Result<PageOutcomes> {
        let template_root = templates::prepare(&request.templates, workdir).await?;
        let pdf_dir = workdir.join("pdfs");
        let image_dir = workdir.join("images");
        tokio::fs::create_dir_all(&pdf_dir).await?;
        tokio::fs::create_dir_all(&image_dir).await?;

        let badge_rival = write_badge(workdir, "badge_rival.png", request.rival_badge.as_deref()).await?;
        let badge_base = write_badge(workdir, "badge_coach.png", request.base_badge.as_deref()).await?;

        let ctx = RunContext {
            request,
            artifacts,
            variables: Variables::for_run(&request.params, &request.header, &request.header_full),
            images: ImageContext {
                workdir: image_dir,
                params: request.params.clone(),
                badge_base,
                badge_rival,
            },
            pdf_dir,
        };

        let mut outcome = PageOutcomes::default();
        for (index, page) in self.pages.pages.iter().enumerate() {
            let name = page.display_name().to_string();
            if page.template.trim().is_empty() {
                warn!("Page {} has no template, skipping", index + 1);
                continue;
            }
            let Some(path) = find_template(&template_root, &page.template) else {
                warn!("Template {} not found", page.template);
                outcome.missing.push(page.template.clone());
                continue;
            };

            match self.run_page(index, page, &path, &ctx).await {
                Ok(pdf) => {
                    debug!("Page {} exported to {}", name, pdf.display());
                    outcome.created.push((name, pdf));
                }
                Err(e) if e.aborts_run() => return Err(e),
                Err(e) => {
                    warn!("Page {} dropped: {}", name, e.user_message());
                    outcome.failed.push(name);
                }
            }
        }
        Ok(outcome)
    }

    /// Open, transform, export and close one page
    async fn run_page(
        &self,
        index: usize,
        page: &PageConfig,
        template: &Path,
        ctx: &RunContext<'_>,
    ) -> Result<PathBuf> {
        let doc = self.client.open(template).await?;
        let result = self.transform_and_export(index, page, doc.as_ref(), ctx).await;
        if let Err(e) = self.client.close(doc.as_ref()).await {
            if e.aborts_run() {
                return Err(e);
            }
            warn!("Could not close {}: {}", doc.name(), e);
        }
        result
    }

    async fn transform_and_export(
        &self,
        index: usize,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<PathBuf> {
        for op in &page.pipeline {
            debug!("{}: {}", page.display_name(), op);
            if let Err(e) = self.apply(op, page, doc, ctx).await {
                if e.aborts_run() || matches!(e, ReportError::Config { .. }) {
                    return Err(e);
                }
                warn!("{}: {} failed: {}", page.display_name(), op, e.user_message());
            }
        }

        let stem = Path::new(&page.template)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("page{}", index + 1));
        let output = ctx.pdf_dir.join(format!("{:02}_{}.pdf", index + 1, stem));
        self.client.export_pdf(doc, &output).await?;
        Ok(output)
    }

    fn header_placeholder<'a>(&'a self, page: &'a PageConfig) -> &'a str {
        page.header_placeholder
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(if self.header_placeholder.is_empty() {
                DEFAULT_HEADER_PLACEHOLDER
            } else {
                &self.header_placeholder
            })
    }
}

async fn write_badge(workdir: &Path, name: &str, bytes: Option<&[u8]>) -> Result<Option<PathBuf>> {
    match bytes {
        Some(bytes) if !bytes.is_empty() => {
            let path = workdir.join(name);
            tokio::fs::write(&path, bytes).await?;
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Field;

    fn params(field: Field) -> ParameterSet {
        ParameterSet::new("Alpha FC", "Charlton Athletic", "League One", field, "2025-2026", 7)
            .unwrap()
    }

    #[test]
    fn test_match_header_lines() {
        let header = MatchHeader {
            matchday: 7,
            rival_code: "CHA".into(),
            date: "2025-08-09".into(),
            time: "13:30:00".into(),
            venue: "The Valley".into(),
        };
        assert_eq!(header.short(&params(Field::Away)), "Matchday 7 | CHA (A)");
        assert_eq!(header.full(), "Matchday 7 | 2025-08-09 13:30 h | The Valley");

        let request = ReportRequest::new(params(Field::Home), TemplateSource::from_path("t.zip"))
            .with_match_header(&header);
        assert_eq!(request.header, "Matchday 7 | CHA (H)");
    }

    #[test]
    fn test_header_placeholder_precedence() {
        let generator = ReportGenerator::new(
            Arc::new(crate::host::LocalHost::new()),
            PagesConfig::default(),
        );
        let mut page: PageConfig = serde_yaml::from_str("template: p.yaml").unwrap();
        assert_eq!(generator.header_placeholder(&page), DEFAULT_HEADER_PLACEHOLDER);
        page.header_placeholder = Some("Jornada 1".into());
        assert_eq!(generator.header_placeholder(&page), "Jornada 1");
    }
}
