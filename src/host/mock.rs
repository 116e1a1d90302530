//! Scriptable host for tests
//!
//! [`MockHost`] wraps a real host (a [`LocalHost`] by default) and can reject
//! named operations as busy a set number of times, or fail them outright.
//! Every call is recorded by operation name.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    HostDocument, HostError, LocalHost, PageSetup, PictureBox, RenderingHost, TextReplace,
};
use crate::reconcile::TemplateTable;

#[derive(Debug, Default)]
struct Script {
    busy: HashMap<String, u32>,
    failures: HashMap<String, String>,
    calls: Vec<String>,
}

impl Script {
    fn check(&mut self, operation: &str) -> Result<(), HostError> {
        self.calls.push(operation.to_string());
        if let Some(message) = self.failures.get(operation) {
            return Err(HostError::operation(operation, message.clone()));
        }
        match self.busy.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(HostError::Busy(format!("{operation} rejected")))
            }
            _ => Ok(()),
        }
    }
}

type SharedScript = Arc<Mutex<Script>>;

/// Mock implementation of [`RenderingHost`] for testing
pub struct MockHost {
    inner: Arc<dyn RenderingHost>,
    script: SharedScript,
    pumps: Arc<AtomicU32>,
    quits: Arc<AtomicU32>,
}

impl MockHost {
    /// Create a mock over a fresh [`LocalHost`]
    #[must_use]
    pub fn new() -> Self {
        Self::wrapping(Arc::new(LocalHost::new()))
    }

    pub fn wrapping(inner: Arc<dyn RenderingHost>) -> Self {
        Self {
            inner,
            script: Arc::new(Mutex::new(Script::default())),
            pumps: Arc::new(AtomicU32::new(0)),
            quits: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Reject the next `times` calls of `operation` as busy
    pub async fn reject_busy(&self, operation: &str, times: u32) {
        self.script
            .lock()
            .await
            .busy
            .insert(operation.to_string(), times);
    }

    /// Fail every call of `operation` with a non-transient error
    pub async fn fail_operation(&self, operation: &str, message: &str) {
        self.script
            .lock()
            .await
            .failures
            .insert(operation.to_string(), message.to_string());
    }

    /// Get the operations called so far, in order
    pub async fn get_called_operations(&self) -> Vec<String> {
        self.script.lock().await.calls.clone()
    }

    pub fn pump_count(&self) -> u32 {
        self.pumps.load(Ordering::SeqCst)
    }

    pub fn quit_count(&self) -> u32 {
        self.quits.load(Ordering::SeqCst)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderingHost for MockHost {
    async fn open(&self, path: &Path) -> Result<Box<dyn HostDocument>, HostError> {
        self.script.lock().await.check("open")?;
        let inner = self.inner.open(path).await?;
        Ok(Box::new(MockDocument {
            inner,
            script: Arc::clone(&self.script),
        }))
    }

    fn pump_messages(&self) {
        self.pumps.fetch_add(1, Ordering::SeqCst);
        self.inner.pump_messages();
    }

    async fn quit(&self) -> Result<(), HostError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        self.script.lock().await.check("quit")?;
        self.inner.quit().await
    }
}

struct MockDocument {
    inner: Box<dyn HostDocument>,
    script: SharedScript,
}

impl MockDocument {
    async fn check(&self, operation: &str) -> Result<(), HostError> {
        self.script.lock().await.check(operation)
    }
}

#[async_trait]
impl HostDocument for MockDocument {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn replace_text(&self, replace: &TextReplace) -> Result<usize, HostError> {
        self.check("replace_text").await?;
        self.inner.replace_text(replace).await
    }

    async fn delete_paragraphs(&self, marker: &str, keep_first: bool) -> Result<usize, HostError> {
        self.check("delete_paragraphs").await?;
        self.inner.delete_paragraphs(marker, keep_first).await
    }

    async fn table_count(&self) -> Result<usize, HostError> {
        self.check("table_count").await?;
        self.inner.table_count().await
    }

    async fn read_table(&self, index: usize) -> Result<TemplateTable, HostError> {
        self.check("read_table").await?;
        self.inner.read_table(index).await
    }

    async fn write_table(&self, index: usize, table: &TemplateTable) -> Result<(), HostError> {
        self.check("write_table").await?;
        self.inner.write_table(index, table).await
    }

    async fn page_setup(&self) -> Result<PageSetup, HostError> {
        self.check("page_setup").await?;
        self.inner.page_setup().await
    }

    async fn add_picture(&self, image: &Path, placement: &PictureBox) -> Result<(), HostError> {
        self.check("add_picture").await?;
        self.inner.add_picture(image, placement).await
    }

    async fn export_pdf(&self, output: &Path) -> Result<(), HostError> {
        self.check("export_pdf").await?;
        self.inner.export_pdf(output).await
    }

    async fn close(&self) -> Result<(), HostError> {
        self.check("close").await?;
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_counts_down_busy_rejections() {
        let mut script = Script::default();
        script.busy.insert("open".into(), 2);

        assert!(matches!(script.check("open"), Err(HostError::Busy(_))));
        assert!(matches!(script.check("open"), Err(HostError::Busy(_))));
        assert!(script.check("open").is_ok());
        assert_eq!(script.calls.len(), 3);
    }

    #[tokio::test]
    async fn test_quit_is_recorded_even_when_failing() {
        let host = MockHost::new();
        host.fail_operation("quit", "host crashed").await;
        assert!(host.quit().await.is_err());
        assert_eq!(host.quit_count(), 1);
        assert_eq!(host.get_called_operations().await, vec!["quit"]);
    }
}
