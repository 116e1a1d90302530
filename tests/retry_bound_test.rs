//! The automation client's busy-retry bound

mod common;

use std::sync::Arc;
use tempfile::TempDir;

use common::{fast_policy, write_template};
use matchdoc::host::{AutomationClient, MockHost, TextReplace};
use matchdoc::ErrorCode;

fn setup() -> (TempDir, Arc<MockHost>, AutomationClient) {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "page1.yaml", 595.0);
    let host = Arc::new(MockHost::new());
    let client = AutomationClient::with_policy(host.clone(), fast_policy());
    (dir, host, client)
}

#[tokio::test]
async fn test_eleven_rejections_then_success() {
    let (dir, host, client) = setup();
    let doc = client.open(&dir.path().join("page1.yaml")).await.unwrap();

    host.reject_busy("replace_text", 11).await;
    let replaced = client
        .replace_text(doc.as_ref(), &TextReplace::all("page1", "Set pieces"))
        .await
        .unwrap();

    assert_eq!(replaced, 1);
    assert_eq!(host.pump_count(), 11);
    let metrics = client.metrics().await;
    assert_eq!(metrics.successful_calls, 2);
    assert_eq!(metrics.retries.len(), 11);
}

#[tokio::test]
async fn test_twelve_rejections_are_fatal() {
    let (dir, host, client) = setup();
    let doc = client.open(&dir.path().join("page1.yaml")).await.unwrap();

    host.reject_busy("replace_text", 12).await;
    let err = client
        .replace_text(doc.as_ref(), &TextReplace::all("page1", "Set pieces"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::HOST_RETRIES_EXHAUSTED);
    assert!(err.aborts_run());
    assert_eq!(host.pump_count(), 11);

    let calls = host.get_called_operations().await;
    assert_eq!(calls.iter().filter(|op| *op == "replace_text").count(), 12);
}

#[tokio::test]
async fn test_hard_failure_is_not_retried() {
    let (dir, host, client) = setup();
    let doc = client.open(&dir.path().join("page1.yaml")).await.unwrap();

    host.fail_operation("export_pdf", "printer offline").await;
    let err = client
        .export_pdf(doc.as_ref(), &dir.path().join("out.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::HOST_OPERATION_FAILED);
    assert!(!err.aborts_run());
    assert_eq!(host.pump_count(), 0);
}
