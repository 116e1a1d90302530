//! Styled template tables as read from and written back to a page

use serde::{Deserialize, Serialize};

/// Horizontal alignment of a cell's paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    fn is_left(&self) -> bool {
        *self == Alignment::Left
    }
}

/// Visual style of a single cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    /// Background colour as `#rrggbb`; `None` is automatic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shading: Option<String>,
    /// Font colour as `#rrggbb`; `None` is automatic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(skip_serializing_if = "Alignment::is_left")]
    pub alignment: Alignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
}

impl CellStyle {
    /// Drop header styling: automatic background and font colour, regular weight
    pub fn clear_emphasis(&mut self) {
        self.shading = None;
        self.font_color = None;
        self.bold = false;
    }
}

/// One cell: its text plus style
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "CellRepr", into = "CellRepr")]
pub struct TableCell {
    pub text: String,
    pub style: CellStyle,
}

impl TableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: CellStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: CellStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Cells are written as plain scalars unless they carry a style
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Plain(String),
    Number(f64),
    Styled {
        #[serde(default)]
        text: String,
        #[serde(default)]
        style: CellStyle,
    },
}

impl From<CellRepr> for TableCell {
    fn from(repr: CellRepr) -> Self {
        match repr {
            CellRepr::Plain(text) => TableCell::new(text),
            CellRepr::Number(n) => TableCell::new(n.to_string()),
            CellRepr::Styled { text, style } => TableCell { text, style },
        }
    }
}

impl From<TableCell> for CellRepr {
    fn from(cell: TableCell) -> Self {
        if cell.style == CellStyle::default() {
            CellRepr::Plain(cell.text)
        } else {
            CellRepr::Styled {
                text: cell.text,
                style: cell.style,
            }
        }
    }
}

/// A table row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn from_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self {
            cells: texts.into_iter().map(TableCell::new).collect(),
        }
    }

    /// A row with the same cells and styles but no text
    pub fn blank_copy(&self) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .map(|c| TableCell::styled(String::new(), c.style.clone()))
                .collect(),
        }
    }

    /// Copy per-cell styles from `source`, pairing cells by position
    pub fn copy_style_from(&mut self, source: &TableRow) {
        for (dst, src) in self.cells.iter_mut().zip(&source.cells) {
            dst.style = src.style.clone();
        }
    }

    pub fn set_shading(&mut self, color: &str) {
        for cell in &mut self.cells {
            cell.style.shading = Some(color.to_string());
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.text.as_str()).collect()
    }
}

/// A table inside a page template; row 0 is the header
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateTable {
    pub rows: Vec<TableRow>,
}

impl TemplateTable {
    pub fn new(rows: Vec<TableRow>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows after the header
    pub fn body_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Widest row; tables are rectangular in practice
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Trimmed text of a cell, empty when absent
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).map(|c| c.text.trim()).unwrap_or("")
    }

    /// Labels in column 0 of every body row
    pub fn row_labels(&self) -> Vec<String> {
        (1..self.rows.len())
            .map(|r| self.text(r, 0).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_parse_plain_and_styled() {
        let yaml = r##"
rows:
  - [{text: "Player", style: {shading: "#000000", font_color: "#ffffff", bold: true}}, "Goals"]
  - ["", 3]
"##;
        let table: TemplateTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert!(table.rows[0].cells[0].style.bold);
        assert_eq!(table.rows[0].cells[0].style.shading.as_deref(), Some("#000000"));
        assert_eq!(table.text(1, 1), "3");
        assert_eq!(table.row_labels(), vec![String::new()]);
    }

    #[test]
    fn test_unstyled_cells_serialize_as_plain_text() {
        let table = TemplateTable::new(vec![TableRow::from_texts(["a", "b"])]);
        let yaml = serde_yaml::to_string(&table).unwrap();
        assert!(yaml.contains("- a"));
        assert!(!yaml.contains("style"));
    }

    #[test]
    fn test_blank_copy_keeps_styles() {
        let mut row = TableRow::from_texts(["x", "y"]);
        row.cells[1].style.italic = true;
        let copy = row.blank_copy();
        assert_eq!(copy.texts(), vec!["", ""]);
        assert!(copy.cells[1].style.italic);
    }
}
