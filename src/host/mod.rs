//! Rendering host abstraction
//!
//! A rendering host opens page templates, edits them in place and exports each
//! one as a single-page PDF. Every call the pipeline makes goes through
//! [`AutomationClient`], which retries calls the host rejects while busy.

pub mod client;
pub mod local;
pub mod mock;

pub use client::AutomationClient;
pub use local::LocalHost;
pub use mock::MockHost;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::reconcile::TemplateTable;
use crate::retry::Transient;

/// Points per centimetre
pub const POINTS_PER_CM: f64 = 28.346_456_7;

pub fn cm_to_points(cm: f64) -> f64 {
    cm * POINTS_PER_CM
}

/// Errors raised by a rendering host
#[derive(Debug, Error)]
pub enum HostError {
    /// The host rejected the call; trying again later may succeed
    #[error("host is busy: {0}")]
    Busy(String),

    #[error("document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{operation} failed: {message}")]
    Operation { operation: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl Transient for HostError {
    fn is_transient(&self) -> bool {
        matches!(self, HostError::Busy(_))
    }
}

/// How many matches a replacement rewrites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceMode {
    #[default]
    All,
    First,
}

/// One find-and-replace request
#[derive(Debug, Clone, PartialEq)]
pub struct TextReplace {
    pub find: String,
    pub replace: String,
    pub mode: ReplaceMode,
    /// Render the inserted text bold
    pub bold: bool,
    pub match_case: bool,
}

impl TextReplace {
    /// Replace every case-insensitive match
    pub fn all(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
            mode: ReplaceMode::All,
            bold: false,
            match_case: false,
        }
    }

    /// Replace only the first case-insensitive match
    pub fn first(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            mode: ReplaceMode::First,
            ..Self::all(find, replace)
        }
    }

    pub fn with_mode(mut self, mode: ReplaceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Page size and margins, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    #[serde(default = "default_width")]
    pub width_pt: f64,
    #[serde(default = "default_height")]
    pub height_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_left_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_right_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_top_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_bottom_pt: f64,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width_pt: default_width(),
            height_pt: default_height(),
            margin_left_pt: default_margin(),
            margin_right_pt: default_margin(),
            margin_top_pt: default_margin(),
            margin_bottom_pt: default_margin(),
        }
    }
}

impl PageSetup {
    pub fn usable_width(&self) -> f64 {
        self.width_pt - self.margin_left_pt - self.margin_right_pt
    }
}

// A4 with 2.54 cm margins
fn default_width() -> f64 {
    595.28
}

fn default_height() -> f64 {
    841.89
}

fn default_margin() -> f64 {
    72.0
}

/// Whether a picture floats above or below the page text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    #[default]
    Front,
    Behind,
}

/// Where a picture goes on the page, measured from the top-left corner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureBox {
    pub left_pt: f64,
    pub top_pt: f64,
    #[serde(default)]
    pub width_pt: Option<f64>,
    #[serde(default)]
    pub height_pt: Option<f64>,
    #[serde(default)]
    pub layer: Layer,
}

impl PictureBox {
    /// Absolute placement from centimetre coordinates; non-positive sizes keep
    /// the picture's own size
    pub fn from_cm(left_cm: f64, top_cm: f64, width_cm: f64, height_cm: f64) -> Self {
        let size = |cm: f64| (cm > 0.0).then(|| cm_to_points(cm));
        Self {
            left_pt: cm_to_points(left_cm),
            top_pt: cm_to_points(top_cm),
            width_pt: size(width_cm),
            height_pt: size(height_cm),
            layer: Layer::Front,
        }
    }

    pub fn behind(mut self) -> Self {
        self.layer = Layer::Behind;
        self
    }
}

/// A host session able to open templates
#[async_trait]
pub trait RenderingHost: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn HostDocument>, HostError>;

    /// Drain pending host messages; called between retry attempts
    fn pump_messages(&self);

    async fn quit(&self) -> Result<(), HostError>;
}

/// An open template document
///
/// Table indices are 0-based in document order.
#[async_trait]
pub trait HostDocument: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the number of matches rewritten
    async fn replace_text(&self, replace: &TextReplace) -> Result<usize, HostError>;

    /// Delete paragraphs containing `marker`; returns how many were deleted
    async fn delete_paragraphs(&self, marker: &str, keep_first: bool)
        -> Result<usize, HostError>;

    async fn table_count(&self) -> Result<usize, HostError>;

    async fn read_table(&self, index: usize) -> Result<TemplateTable, HostError>;

    async fn write_table(&self, index: usize, table: &TemplateTable) -> Result<(), HostError>;

    async fn page_setup(&self) -> Result<PageSetup, HostError>;

    async fn add_picture(&self, image: &Path, placement: &PictureBox) -> Result<(), HostError>;

    async fn export_pdf(&self, output: &Path) -> Result<(), HostError>;

    async fn close(&self) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_busy_is_transient() {
        assert!(HostError::Busy("rejected".into()).is_transient());
        assert!(!HostError::NotFound(PathBuf::from("page1.yaml")).is_transient());
        assert!(!HostError::operation("export", "disk full").is_transient());
    }

    #[test]
    fn test_picture_box_from_cm() {
        let placement = PictureBox::from_cm(1.0, 2.0, 3.0, 0.0);
        assert!((placement.left_pt - 28.3464567).abs() < 1e-6);
        assert!((placement.top_pt - 56.6929134).abs() < 1e-6);
        assert!(placement.width_pt.is_some());
        assert_eq!(placement.height_pt, None);
        assert_eq!(placement.behind().layer, Layer::Behind);
    }

    #[test]
    fn test_replace_builders() {
        let r = TextReplace::first("CHARLTON ATHLETIC", "BETA UNITED").bold();
        assert_eq!(r.mode, ReplaceMode::First);
        assert!(r.bold);
        assert!(!r.match_case);
    }
}
