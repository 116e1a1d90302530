//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use matchdoc::cache::source::artifacts_from_tables;
use matchdoc::cache::{ArtifactSet, DatasetSource, SourceError};
use matchdoc::retry::RetryPolicy;
use matchdoc::table::{DataTable, Value};
use matchdoc::{Field, ParameterSet};

pub fn params(sample_size: u32) -> ParameterSet {
    ParameterSet::new(
        "Alpha FC",
        "Charlton Athletic",
        "League One",
        Field::Away,
        "2025-2026",
        sample_size,
    )
    .unwrap()
}

/// Full twelve-attempt bound with millisecond waits
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        factor: 1.0,
        ..RetryPolicy::default()
    }
}

/// A one-paragraph page template of the given width
pub fn template(width_pt: f64, text: &str) -> String {
    format!(
        "page:\n  width_pt: {width_pt}\nbody:\n  - paragraph: \"Matchday 1 | CHA (A)\"\n  - paragraph: \"{text}\"\n"
    )
}

pub fn write_template(dir: &Path, name: &str, width_pt: f64) {
    std::fs::write(dir.join(name), template(width_pt, name)).unwrap();
}

/// MediaBox width of every page, in document order
pub fn page_widths(pdf: &[u8]) -> Vec<f32> {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_object(*id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_float().unwrap()
        })
        .collect()
}

/// Source that counts computations and tags every table with the team name
pub struct CountingSource {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for CountingSource {
    async fn compute(&self, params: &ParameterSet) -> Result<ArtifactSet, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(sample_artifacts(params.team()))
    }
}

pub fn sample_artifacts(team: &str) -> ArtifactSet {
    artifacts_from_tables(|kind| {
        DataTable::from_rows(
            vec!["teamName", "artifact"],
            vec![vec![Value::text(team), Value::text(kind.file_name())]],
        )
    })
}
