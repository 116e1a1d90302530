//! Pouring derived tables into fixed-layout template tables
//!
//! A template table has one header row (row 0) and at least one body row whose
//! style is the source for every row added during a fill. Three modes exist:
//!
//! - [`FillMode::Direct`]: body rows mirror the derived table cell by cell.
//! - [`FillMode::HeaderRemap`]: header cells between the first and last column
//!   take entity names; body rows are matched to derived rows by the label the
//!   template already carries in column 0, and the last column is the row sum.
//! - [`FillMode::Totals`]: like direct, plus a trailing `TOTAL` row with column sums.
//!
//! Writes outside the template's columns are skipped and counted; a fill never fails.

pub mod format;
pub mod table;

pub use format::NumberFormat;
pub use table::{Alignment, CellStyle, TableCell, TableRow, TemplateTable};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::table::{DataTable, Value};

/// Label written in the first cell of the totals row
pub const TOTAL_LABEL: &str = "TOTAL";

/// Row-label column names produced by transposed summaries
pub const LABEL_COLUMNS: [&str; 2] = ["Per Opposition", "Per Player"];

/// How a derived table maps onto a template table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    Direct,
    HeaderRemap,
    Totals,
}

/// What a fill did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    /// Body rows that received data
    pub rows_written: usize,
    /// Values that had no cell to go into
    pub skipped_cells: usize,
    /// Template labels with no derived row; rendered blank
    pub unmatched_labels: Vec<String>,
    /// Derived rows whose label the template does not carry
    pub dropped_rows: usize,
    /// Entity columns beyond the template's header slots
    pub dropped_entities: usize,
}

/// Fill `template` with `derived` according to `mode`
pub fn fill(
    template: &mut TemplateTable,
    derived: &DataTable,
    mode: FillMode,
    format: &NumberFormat,
) -> FillReport {
    let report = match mode {
        FillMode::Direct => fill_direct(template, derived, format),
        FillMode::HeaderRemap => fill_header_remap(template, derived, format),
        FillMode::Totals => fill_totals(template, derived, format),
    };
    if report.skipped_cells > 0 {
        warn!(
            "{} values did not fit the {}-column template table",
            report.skipped_cells,
            template.column_count()
        );
    }
    debug!("Filled table in {:?} mode: {:?}", mode, report);
    report
}

/// Make sure row 1 exists and carries body styling rather than header styling
pub fn ensure_body_template_row(template: &mut TemplateTable) {
    if template.rows.is_empty() {
        return;
    }
    if template.rows.len() == 1 {
        let row = template.rows[0].blank_copy();
        template.rows.push(row);
    }
    for cell in &mut template.rows[1].cells {
        cell.style.clear_emphasis();
    }
}

/// Shade body rows whose first cell names the team or the rival (case-insensitive)
pub fn highlight_rows(
    template: &mut TemplateTable,
    team: &str,
    rival: &str,
    team_color: &str,
    rival_color: &str,
) -> usize {
    let team = team.trim().to_lowercase();
    let rival = rival.trim().to_lowercase();
    let mut shaded = 0;
    for row in template.rows.iter_mut().skip(1) {
        let label = row
            .cells
            .first()
            .map(|c| c.text.trim().to_lowercase())
            .unwrap_or_default();
        if label.is_empty() {
            continue;
        }
        if label == team {
            row.set_shading(team_color);
            shaded += 1;
        } else if label == rival {
            row.set_shading(rival_color);
            shaded += 1;
        }
    }
    shaded
}

/// Resize the body to `n` rows, keeping `trailing` fixed rows at the end
fn resize_body(template: &mut TemplateTable, n: usize, trailing: usize, style_source: &TableRow) {
    let fixed = 1 + trailing;
    let current = template.rows.len().saturating_sub(fixed);
    let insert_at = template.rows.len() - trailing;
    if current > n {
        template.rows.drain(1 + n..insert_at);
    } else {
        for offset in 0..(n - current) {
            template
                .rows
                .insert(insert_at + offset, style_source.blank_copy());
        }
    }
}

/// Write derived rows into body rows `1..=n`; column 0 bold, the rest regular
fn write_body(
    template: &mut TemplateTable,
    derived: &DataTable,
    format: &NumberFormat,
    report: &mut FillReport,
) {
    let width = template.column_count();
    for (i, values) in derived.rows.iter().enumerate() {
        let row_idx = i + 1;
        for (col, value) in values.iter().enumerate() {
            match template.cell_mut(row_idx, col) {
                Some(cell) => {
                    cell.text = format.format_value(value);
                    cell.style.bold = col == 0;
                }
                None => report.skipped_cells += 1,
            }
        }
        for col in values.len()..width {
            if let Some(cell) = template.cell_mut(row_idx, col) {
                cell.text.clear();
            }
        }
        report.rows_written += 1;
    }
}

fn fill_direct(template: &mut TemplateTable, derived: &DataTable, format: &NumberFormat) -> FillReport {
    let mut report = FillReport::default();
    if template.rows.is_empty() {
        report.skipped_cells = derived.len() * derived.width();
        return report;
    }

    ensure_body_template_row(template);
    let style_source = template.rows[1].clone();
    resize_body(template, derived.len(), 0, &style_source);
    write_body(template, derived, format, &mut report);
    report
}

fn fill_totals(template: &mut TemplateTable, derived: &DataTable, format: &NumberFormat) -> FillReport {
    let mut report = FillReport::default();
    if template.rows.is_empty() {
        report.skipped_cells = derived.len() * derived.width();
        return report;
    }

    ensure_body_template_row(template);
    // Header, body template and the totals row
    while template.rows.len() < 3 {
        let row = template.rows[1].blank_copy();
        template.rows.push(row);
    }
    let style_source = template.rows[1].clone();
    resize_body(template, derived.len(), 1, &style_source);
    write_body(template, derived, format, &mut report);

    let mut totals = vec![Value::text(TOTAL_LABEL)];
    totals.extend((1..derived.width()).map(|col| Value::Number(derived.column_sum(col))));

    let header = template.rows[0].clone();
    let last = template.rows.len() - 1;
    let row = &mut template.rows[last];
    for (col, cell) in row.cells.iter_mut().enumerate() {
        cell.text = totals
            .get(col)
            .map(|v| format.format_value(v))
            .unwrap_or_default();
    }
    report.skipped_cells += totals.len().saturating_sub(row.cells.len());
    row.copy_style_from(&header);
    for cell in &mut row.cells {
        cell.style.alignment = Alignment::Center;
        cell.style.bold = true;
    }
    report
}

fn fill_header_remap(
    template: &mut TemplateTable,
    derived: &DataTable,
    format: &NumberFormat,
) -> FillReport {
    let mut report = FillReport::default();
    let n_cols = template.column_count();
    if n_cols < 2 {
        return report;
    }
    // Past the body template row the body keeps its size: rows are keyed by their own labels
    ensure_body_template_row(template);

    let label_col = LABEL_COLUMNS
        .iter()
        .find_map(|name| derived.column_index(name))
        .unwrap_or(0);
    let entity_cols: Vec<usize> = (0..derived.width()).filter(|&c| c != label_col).collect();
    let slots = n_cols - 2;
    report.dropped_entities = entity_cols.len().saturating_sub(slots);
    let entity_cols = &entity_cols[..entity_cols.len().min(slots)];

    for slot in 0..slots {
        let name = entity_cols
            .get(slot)
            .map(|&c| derived.columns[c].clone())
            .unwrap_or_default();
        match template.cell_mut(0, slot + 1) {
            Some(cell) => cell.text = name,
            None => report.skipped_cells += 1,
        }
    }

    let mut by_label: HashMap<String, usize> = HashMap::new();
    for (i, row) in derived.rows.iter().enumerate() {
        let label = row.get(label_col).map(Value::as_label).unwrap_or_default();
        by_label.entry(label).or_insert(i);
    }

    let labels = template.row_labels();
    let mut matched = 0;
    for (offset, label) in labels.iter().enumerate() {
        let row_idx = offset + 1;
        let source = by_label.get(label.as_str()).map(|&i| &derived.rows[i]);
        if source.is_some() {
            matched += 1;
        } else if !label.is_empty() {
            report.unmatched_labels.push(label.clone());
        }

        let mut sum = 0.0;
        for slot in 0..slots {
            let value = match (source, entity_cols.get(slot)) {
                (Some(row), Some(&col)) => row.get(col).cloned().unwrap_or_default(),
                _ => Value::Null,
            };
            sum += value.as_f64().unwrap_or(0.0);
            match template.cell_mut(row_idx, slot + 1) {
                Some(cell) => cell.text = format.format_value(&value),
                None => report.skipped_cells += 1,
            }
        }

        let total = if source.is_some() {
            format.format_number(sum)
        } else {
            String::new()
        };
        match template.cell_mut(row_idx, n_cols - 1) {
            Some(cell) => cell.text = total,
            None => report.skipped_cells += 1,
        }
        if source.is_some() {
            report.rows_written += 1;
        }
    }
    report.dropped_rows = by_label.len().saturating_sub(matched);
    report
}
