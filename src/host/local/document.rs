//! In-memory page model behind [`super::LocalHost`]
//!
//! A page template is a YAML document:
//!
//! ```yaml
//! page: { width_pt: 595.28, height_pt: 841.89 }
//! body:
//!   - paragraph: "Matchday 1 | CHA (A)"
//!   - paragraph: { text: "CHARLTON ATHLETIC", bold: true, size: 20 }
//!   - table:
//!       rows:
//!         - [Team Name, Games]
//!         - ["", ""]
//! shapes:
//!   - left_pt: 400
//!     top_pt: 40
//!     paragraphs: ["Set pieces"]
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::with::singleton_map_recursive;
use std::path::PathBuf;

use crate::host::{PageSetup, PictureBox, ReplaceMode, TextReplace};
use crate::reconcile::{Alignment, TemplateTable};

/// A stretch of text with one weight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
}

impl Run {
    pub fn new(text: impl Into<String>, bold: bool) -> Self {
        Self {
            text: text.into(),
            bold,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParagraphRepr", into = "ParagraphRepr")]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub size: Option<f32>,
    pub alignment: Alignment,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ParagraphRepr {
    Plain(String),
    Runs {
        runs: Vec<Run>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<f32>,
        #[serde(default)]
        alignment: Alignment,
    },
    Text {
        text: String,
        #[serde(default)]
        bold: bool,
        #[serde(default)]
        size: Option<f32>,
        #[serde(default)]
        alignment: Alignment,
    },
}

impl From<ParagraphRepr> for Paragraph {
    fn from(repr: ParagraphRepr) -> Self {
        match repr {
            ParagraphRepr::Plain(text) => Paragraph::plain(text),
            ParagraphRepr::Runs {
                runs,
                size,
                alignment,
            } => Paragraph {
                runs,
                size,
                alignment,
            },
            ParagraphRepr::Text {
                text,
                bold,
                size,
                alignment,
            } => Paragraph {
                runs: vec![Run::new(text, bold)],
                size,
                alignment,
            },
        }
    }
}

impl From<Paragraph> for ParagraphRepr {
    fn from(paragraph: Paragraph) -> Self {
        ParagraphRepr::Runs {
            runs: paragraph.runs,
            size: paragraph.size,
            alignment: paragraph.alignment,
        }
    }
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![Run::new(text, false)],
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Replace matches inside each run, at most `budget` of them
    ///
    /// Bold replacements split the run so only the inserted text is bold.
    fn replace(&mut self, replace: &TextReplace, budget: &mut Option<usize>) -> usize {
        let mut count = 0;
        let mut runs = Vec::with_capacity(self.runs.len());

        for run in self.runs.drain(..) {
            let mut buffer = String::new();
            let mut cursor = 0;
            while budget.map_or(true, |b| b > 0) {
                let Some((start, end)) =
                    find_from(&run.text, &replace.find, cursor, replace.match_case)
                else {
                    break;
                };
                buffer.push_str(&run.text[cursor..start]);
                if replace.bold && !run.bold {
                    if !buffer.is_empty() {
                        runs.push(Run::new(std::mem::take(&mut buffer), false));
                    }
                    runs.push(Run::new(replace.replace.clone(), true));
                } else {
                    buffer.push_str(&replace.replace);
                }
                cursor = end;
                count += 1;
                if let Some(b) = budget.as_mut() {
                    *b -= 1;
                }
            }
            buffer.push_str(&run.text[cursor..]);
            if !buffer.is_empty() {
                runs.push(Run::new(buffer, run.bold));
            }
        }

        if runs.is_empty() {
            runs.push(Run::default());
        }
        self.runs = runs;
        count
    }
}

/// A positioned text box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub left_pt: f64,
    pub top_pt: f64,
    #[serde(default)]
    pub width_pt: Option<f64>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    pub path: PathBuf,
    #[serde(flatten)]
    pub placement: PictureBox,
}

/// Main-story content, top to bottom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(TemplateTable),
    /// Vertical gap in points
    Spacer(f64),
}

/// One page template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    #[serde(default)]
    pub page: PageSetup,
    #[serde(default)]
    pub body: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<TextBox>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pictures: Vec<Picture>,
}

impl PageDocument {
    /// Parse a template; blocks are written as single-key maps (`- table: ...`)
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(source))
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut buffer = Vec::new();
        singleton_map_recursive::serialize(self, &mut serde_yaml::Serializer::new(&mut buffer))?;
        String::from_utf8(buffer).map_err(serde::ser::Error::custom)
    }

    /// Replace text in the main story, table cells included, then in text boxes
    pub fn replace_text(&mut self, replace: &TextReplace) -> usize {
        if replace.find.is_empty() {
            return 0;
        }
        let mut budget = match replace.mode {
            ReplaceMode::All => None,
            ReplaceMode::First => Some(1),
        };
        let mut count = 0;

        for block in &mut self.body {
            match block {
                Block::Paragraph(p) => count += p.replace(replace, &mut budget),
                Block::Table(table) => {
                    for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                        let mut paragraph = Paragraph::plain(cell.text.clone());
                        let n = paragraph.replace(replace, &mut budget);
                        if n > 0 {
                            cell.text = paragraph.text();
                            cell.style.bold |= replace.bold;
                            count += n;
                        }
                    }
                }
                Block::Spacer(_) => {}
            }
        }
        for shape in &mut self.shapes {
            for p in &mut shape.paragraphs {
                count += p.replace(replace, &mut budget);
            }
        }
        count
    }

    /// Delete every paragraph containing `marker`, main story first
    pub fn delete_paragraphs(&mut self, marker: &str, keep_first: bool) -> usize {
        if marker.is_empty() {
            return 0;
        }
        let mut kept = !keep_first;
        let mut deleted = 0;
        let mut should_delete = |p: &Paragraph| {
            if !p.text().contains(marker) {
                return false;
            }
            if !kept {
                kept = true;
                return false;
            }
            deleted += 1;
            true
        };

        self.body.retain(|block| match block {
            Block::Paragraph(p) => !should_delete(p),
            _ => true,
        });
        for shape in &mut self.shapes {
            shape.paragraphs.retain(|p| !should_delete(p));
        }
        deleted
    }

    pub fn tables(&self) -> impl Iterator<Item = &TemplateTable> {
        self.body.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn table_mut(&mut self, index: usize) -> Option<&mut TemplateTable> {
        self.body
            .iter_mut()
            .filter_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .nth(index)
    }

    /// Concatenated text of every paragraph, for inspection
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.body {
            match block {
                Block::Paragraph(p) => lines.push(p.text()),
                Block::Table(t) => {
                    for row in &t.rows {
                        lines.push(row.texts().join(" | "));
                    }
                }
                Block::Spacer(_) => {}
            }
        }
        for shape in &self.shapes {
            lines.extend(shape.paragraphs.iter().map(Paragraph::text));
        }
        lines.join("\n")
    }
}

/// Byte range of the first match of `needle` at or after `from`
fn find_from(haystack: &str, needle: &str, from: usize, match_case: bool) -> Option<(usize, usize)> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    for (offset, _) in haystack[from..].char_indices() {
        let start = from + offset;
        let mut candidate = haystack[start..].char_indices();
        let mut end = start;
        let matched = needle.chars().all(|n| match candidate.next() {
            Some((i, h)) if chars_equal(h, n, match_case) => {
                end = start + i + h.len_utf8();
                true
            }
            _ => false,
        });
        if matched {
            return Some((start, end));
        }
    }
    None
}

fn chars_equal(a: char, b: char, match_case: bool) -> bool {
    a == b || (!match_case && a.to_lowercase().eq(b.to_lowercase()))
}
