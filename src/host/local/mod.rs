//! File-backed rendering host
//!
//! Templates are YAML [`PageDocument`]s. Edits happen in memory and
//! `export_pdf` writes a single-page PDF.

mod document;
mod render;

pub use document::{Block, PageDocument, Paragraph, Picture, Run, TextBox};
pub use render::render_pdf;

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use super::{HostDocument, HostError, PageSetup, PictureBox, RenderingHost, TextReplace};
use crate::reconcile::TemplateTable;

#[derive(Debug)]
pub struct LocalHost {
    opened: AtomicUsize,
    running: AtomicBool,
}

impl LocalHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            opened: AtomicUsize::new(0),
            running: AtomicBool::new(true),
        }
    }

    /// Documents opened during this session
    pub fn documents_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderingHost for LocalHost {
    async fn open(&self, path: &Path) -> Result<Box<dyn HostDocument>, HostError> {
        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HostError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let page = PageDocument::from_yaml(&source)
            .map_err(|e| HostError::operation("open", format!("{}: {}", path.display(), e)))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LocalDocument::new(path, page)))
    }

    fn pump_messages(&self) {}

    async fn quit(&self) -> Result<(), HostError> {
        self.running.store(false, Ordering::SeqCst);
        debug!(
            "Local host quit after {} documents",
            self.documents_opened()
        );
        Ok(())
    }
}

/// An open template held in memory
#[derive(Debug)]
pub struct LocalDocument {
    name: String,
    page: Mutex<PageDocument>,
    closed: AtomicBool,
}

impl LocalDocument {
    pub fn new(path: &Path, page: PageDocument) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            page: Mutex::new(page),
            closed: AtomicBool::new(false),
        }
    }

    /// Copy of the page in its current state
    pub async fn snapshot(&self) -> PageDocument {
        self.page.lock().await.clone()
    }

    fn ensure_open(&self, operation: &str) -> Result<(), HostError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HostError::operation(
                operation,
                format!("{} is already closed", self.name),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl HostDocument for LocalDocument {
    fn name(&self) -> &str {
        &self.name
    }

    async fn replace_text(&self, replace: &TextReplace) -> Result<usize, HostError> {
        self.ensure_open("replace_text")?;
        Ok(self.page.lock().await.replace_text(replace))
    }

    async fn delete_paragraphs(&self, marker: &str, keep_first: bool) -> Result<usize, HostError> {
        self.ensure_open("delete_paragraphs")?;
        Ok(self.page.lock().await.delete_paragraphs(marker, keep_first))
    }

    async fn table_count(&self) -> Result<usize, HostError> {
        self.ensure_open("table_count")?;
        Ok(self.page.lock().await.tables().count())
    }

    async fn read_table(&self, index: usize) -> Result<TemplateTable, HostError> {
        self.ensure_open("read_table")?;
        self.page
            .lock()
            .await
            .tables()
            .nth(index)
            .cloned()
            .ok_or_else(|| {
                HostError::operation("read_table", format!("{} has no table {}", self.name, index + 1))
            })
    }

    async fn write_table(&self, index: usize, table: &TemplateTable) -> Result<(), HostError> {
        self.ensure_open("write_table")?;
        let mut page = self.page.lock().await;
        let target = page.table_mut(index).ok_or_else(|| {
            HostError::operation("write_table", format!("{} has no table {}", self.name, index + 1))
        })?;
        *target = table.clone();
        Ok(())
    }

    async fn page_setup(&self) -> Result<PageSetup, HostError> {
        self.ensure_open("page_setup")?;
        Ok(self.page.lock().await.page)
    }

    async fn add_picture(&self, image: &Path, placement: &PictureBox) -> Result<(), HostError> {
        self.ensure_open("add_picture")?;
        if !tokio::fs::try_exists(image).await? {
            return Err(HostError::NotFound(image.to_path_buf()));
        }
        self.page.lock().await.pictures.push(Picture {
            path: image.to_path_buf(),
            placement: placement.clone(),
        });
        Ok(())
    }

    async fn export_pdf(&self, output: &Path) -> Result<(), HostError> {
        self.ensure_open("export_pdf")?;
        let bytes = render_pdf(&*self.page.lock().await)?;
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), HostError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
