//! Retrying front end for a rendering host

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::{HostDocument, HostError, PageSetup, PictureBox, RenderingHost, TextReplace};
use crate::error::{ErrorCode, ReportError, Result};
use crate::reconcile::TemplateTable;
use crate::retry::{RetryError, RetryExecutor, RetryMetrics, RetryPolicy};

/// Wraps every host call in the retry discipline
///
/// Busy rejections are retried under the configured [`RetryPolicy`], pumping
/// the host's message queue between attempts. A host that stays busy through
/// every attempt yields an error that aborts the run; any other host failure
/// comes back as a page-scoped [`ReportError::Host`].
pub struct AutomationClient {
    host: Arc<dyn RenderingHost>,
    retry: RetryExecutor,
}

impl AutomationClient {
    pub fn new(host: Arc<dyn RenderingHost>) -> Self {
        Self::with_policy(host, RetryPolicy::default())
    }

    pub fn with_policy(host: Arc<dyn RenderingHost>, policy: RetryPolicy) -> Self {
        let pump = Arc::clone(&host);
        let retry = RetryExecutor::new(policy)
            .with_between_attempts(Arc::new(move || pump.pump_messages()));
        Self { host, retry }
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    pub async fn metrics(&self) -> RetryMetrics {
        self.retry.metrics().await
    }

    /// Run one host call under the retry policy
    pub async fn invoke<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, HostError>>,
    {
        self.retry
            .execute_with_retry(operation, call)
            .await
            .map_err(|err| match err {
                RetryError::Exhausted { attempts, last } => {
                    ReportError::host_exhausted(operation, attempts).with_source(last)
                }
                RetryError::Fatal(HostError::NotFound(path)) => ReportError::host(
                    ErrorCode::HOST_DOCUMENT_NOT_FOUND,
                    operation,
                    format!("{} does not exist", path.display()),
                ),
                RetryError::Fatal(err) => {
                    let message = err.to_string();
                    ReportError::host(ErrorCode::HOST_OPERATION_FAILED, operation, message)
                        .with_source(err)
                }
            })
    }

    pub async fn open(&self, path: &Path) -> Result<Box<dyn HostDocument>> {
        debug!("Opening template {}", path.display());
        self.invoke("open", || self.host.open(path)).await
    }

    pub async fn replace_text(&self, doc: &dyn HostDocument, replace: &TextReplace) -> Result<usize> {
        self.invoke("replace_text", move || doc.replace_text(replace))
            .await
    }

    pub async fn delete_paragraphs(
        &self,
        doc: &dyn HostDocument,
        marker: &str,
        keep_first: bool,
    ) -> Result<usize> {
        self.invoke("delete_paragraphs", move || {
            doc.delete_paragraphs(marker, keep_first)
        })
        .await
    }

    pub async fn table_count(&self, doc: &dyn HostDocument) -> Result<usize> {
        self.invoke("table_count", move || doc.table_count()).await
    }

    pub async fn read_table(&self, doc: &dyn HostDocument, index: usize) -> Result<TemplateTable> {
        self.invoke("read_table", move || doc.read_table(index)).await
    }

    pub async fn write_table(
        &self,
        doc: &dyn HostDocument,
        index: usize,
        table: &TemplateTable,
    ) -> Result<()> {
        self.invoke("write_table", move || doc.write_table(index, table))
            .await
    }

    pub async fn page_setup(&self, doc: &dyn HostDocument) -> Result<PageSetup> {
        self.invoke("page_setup", move || doc.page_setup()).await
    }

    pub async fn add_picture(
        &self,
        doc: &dyn HostDocument,
        image: &Path,
        placement: &PictureBox,
    ) -> Result<()> {
        self.invoke("add_picture", move || doc.add_picture(image, placement))
            .await
    }

    pub async fn export_pdf(&self, doc: &dyn HostDocument, output: &Path) -> Result<()> {
        debug!("Exporting {} to {}", doc.name(), output.display());
        self.invoke("export_pdf", move || doc.export_pdf(output)).await
    }

    pub async fn close(&self, doc: &dyn HostDocument) -> Result<()> {
        self.invoke("close", move || doc.close()).await
    }

    pub async fn quit(&self) -> Result<()> {
        self.invoke("quit", || self.host.quit()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::local::{Block, PageDocument, Paragraph};
    use crate::host::MockHost;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            factor: 1.0,
            max_delay: None,
        }
    }

    fn template(dir: &TempDir) -> std::path::PathBuf {
        let page = PageDocument {
            body: vec![Block::Paragraph(Paragraph::plain("Matchday 1 | CHA (A)"))],
            ..PageDocument::default()
        };
        let path = dir.path().join("page.yaml");
        std::fs::write(&path, page.to_yaml().unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_busy_open_is_retried_and_pumps_messages() {
        let dir = TempDir::new().unwrap();
        let path = template(&dir);
        let host = Arc::new(MockHost::new());
        host.reject_busy("open", 3).await;

        let client = AutomationClient::with_policy(host.clone(), fast_policy(12));
        let doc = client.open(&path).await.unwrap();

        assert_eq!(doc.name(), "page.yaml");
        assert_eq!(host.pump_count(), 3);
        assert_eq!(client.metrics().await.total_attempts, 4);
    }

    #[tokio::test]
    async fn test_exhausted_busy_aborts_run() {
        let dir = TempDir::new().unwrap();
        let path = template(&dir);
        let host = Arc::new(MockHost::new());
        host.reject_busy("open", 5).await;

        let client = AutomationClient::with_policy(host, fast_policy(5));
        let err = client.open(&path).await.err().unwrap();

        assert_eq!(err.code(), ErrorCode::HOST_RETRIES_EXHAUSTED);
        assert!(err.aborts_run());
    }

    #[tokio::test]
    async fn test_missing_document_is_page_scoped() {
        let dir = TempDir::new().unwrap();
        let client = AutomationClient::with_policy(Arc::new(MockHost::new()), fast_policy(3));

        let err = client
            .open(&dir.path().join("absent.yaml"))
            .await
            .err()
            .unwrap();

        assert_eq!(err.code(), ErrorCode::HOST_DOCUMENT_NOT_FOUND);
        assert!(!err.aborts_run());
    }

    #[tokio::test]
    async fn test_operation_failure_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = template(&dir);
        let host = Arc::new(MockHost::new());
        host.fail_operation("replace_text", "range is locked").await;

        let client = AutomationClient::with_policy(host.clone(), fast_policy(12));
        let doc = client.open(&path).await.unwrap();
        let err = client
            .replace_text(doc.as_ref(), &TextReplace::all("CHA", "BET"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::HOST_OPERATION_FAILED);
        let calls = host.get_called_operations().await;
        assert_eq!(calls.iter().filter(|c| *c == "replace_text").count(), 1);
    }
}
