//! # matchdoc
//!
//! Assembles a multi-page scouting report for an upcoming match from a set of
//! page templates and cached statistics datasets.
//!
//! ## Usage
//!
//! ```bash
//! matchdoc generate --team "Alpha FC" --rival "Charlton Athletic" \
//!     --competition "League One" --field away --season 2025-2026 --sample-size 10 \
//!     --templates templates.zip --pages pages.yaml --out report.pdf
//! ```
//!
//! ## Modules
//!
//! - `params` - Report parameters and their content fingerprint
//! - `cache` - Fingerprint-addressed dataset cache with single-flight computation
//! - `table` - In-memory tabular data
//! - `builders` - Named dataset builders that shape cached data into page tables
//! - `reconcile` - Writing data tables into template tables
//! - `retry` - Bounded retry with backoff for transient failures
//! - `host` - Rendering host abstraction and the retrying automation client
//! - `images` - Image builders for per-page pictures
//! - `config` - Settings and per-page configuration
//! - `pipeline` - Page pipeline executor
//! - `merge` - PDF concatenation
pub mod builders;
pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod images;
pub mod merge;
pub mod params;
pub mod pipeline;
pub mod reconcile;
pub mod retry;
pub mod table;

pub use error::{ErrorCode, ReportError, Result};
pub use params::{Field, Fingerprint, ParameterSet};
pub use pipeline::{GeneratedReport, MatchHeader, ReportGenerator, ReportRequest};
