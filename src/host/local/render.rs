//! Single-page PDF rendering of a [`PageDocument`]
//!
//! Layout: paragraphs flow down from the top margin
//! with greedy word wrapping, tables are drawn as an even grid across the
//! usable width, text boxes sit at their absolute position and pictures are
//! drawn as labelled frames. Glyph widths are estimated from the font size.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::document::{Block, PageDocument, Paragraph, Picture, TextBox};
use crate::host::{HostError, Layer, PageSetup};
use crate::reconcile::{Alignment, TemplateTable};

const BODY_SIZE: f64 = 11.0;
const TABLE_SIZE: f64 = 9.0;
const LINE_SPACING: f64 = 1.25;
const ROW_PADDING: f64 = 4.0;
// Average Helvetica advance as a fraction of the font size
const CHAR_WIDTH: f64 = 0.5;

/// Render the page and serialize it
pub fn render_pdf(page: &PageDocument) -> Result<Vec<u8>, HostError> {
    let mut doc = render(page)?;
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

pub fn render(page: &PageDocument) -> Result<Document, HostError> {
    let mut canvas = Canvas::new(page.page);
    for picture in page.pictures.iter().filter(|p| p.placement.layer == Layer::Behind) {
        canvas.picture(picture);
    }
    for block in &page.body {
        match block {
            Block::Paragraph(p) => canvas.paragraph(p),
            Block::Table(t) => canvas.table(t),
            Block::Spacer(gap) => canvas.y -= gap,
        }
    }
    for shape in &page.shapes {
        canvas.text_box(shape);
    }
    for picture in page.pictures.iter().filter(|p| p.placement.layer == Layer::Front) {
        canvas.picture(picture);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });
    let content = Content {
        operations: canvas.operations,
    };
    let encoded = content
        .encode()
        .map_err(|e| HostError::operation("export_pdf", e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), num(page.page.width_pt), num(page.page.height_pt)],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

impl From<lopdf::Error> for HostError {
    fn from(err: lopdf::Error) -> Self {
        HostError::operation("export_pdf", err.to_string())
    }
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn num(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Latin-1 bytes for the standard fonts; other characters become `?`
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            c if (c as u32) < 0x100 => c as u8,
            _ => b'?',
        })
        .collect()
}

fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * CHAR_WIDTH
}

/// `#rrggbb` to PDF colour components
fn parse_color(hex: &str) -> Option<[f64; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .ok()
            .map(|v| f64::from(v) / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

struct Canvas {
    setup: PageSetup,
    /// Top of the remaining main-story space, from the page bottom
    y: f64,
    operations: Vec<Operation>,
}

impl Canvas {
    fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            y: setup.height_pt - setup.margin_top_pt,
            operations: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, rgb: [f64; 3]) {
        self.op("rg", rgb.iter().map(|c| num(*c)).collect());
    }

    /// One line of mixed-weight segments starting at `x`
    fn line(&mut self, x: f64, y: f64, size: f64, segments: &[(String, bool)]) {
        self.op("BT", vec![]);
        self.op("Td", vec![num(x), num(y)]);
        for (text, bold) in segments {
            let font = if *bold { "F2" } else { "F1" };
            self.op("Tf", vec![font.into(), num(size)]);
            self.op("Tj", vec![Object::string_literal(encode_text(text))]);
        }
        self.op("ET", vec![]);
    }

    /// Lay out a paragraph inside `[left, left + width]` below `top`; returns
    /// the top of the space left under it
    fn flow(&mut self, paragraph: &Paragraph, left: f64, width: f64, top: f64) -> f64 {
        let size = paragraph.size.map(f64::from).unwrap_or(BODY_SIZE);
        let mut y = top - size;
        for line in wrap(paragraph, size, width) {
            let line_width: f64 = line.iter().map(|(t, _)| text_width(t, size)).sum();
            let x = match paragraph.alignment {
                Alignment::Left => left,
                Alignment::Center => left + (width - line_width).max(0.0) / 2.0,
                Alignment::Right => left + (width - line_width).max(0.0),
            };
            self.fill_color([0.0; 3]);
            self.line(x, y, size, &line);
            y -= size * LINE_SPACING;
        }
        y + size
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        let (left, width) = (self.setup.margin_left_pt, self.setup.usable_width());
        self.y = self.flow(paragraph, left, width, self.y);
    }

    fn text_box(&mut self, shape: &TextBox) {
        let width = shape
            .width_pt
            .unwrap_or(self.setup.width_pt - shape.left_pt - self.setup.margin_right_pt);
        let mut top = self.setup.height_pt - shape.top_pt;
        for paragraph in &shape.paragraphs {
            top = self.flow(paragraph, shape.left_pt, width, top);
        }
    }

    fn table(&mut self, table: &TemplateTable) {
        let columns = table.column_count();
        if columns == 0 {
            return;
        }
        let left = self.setup.margin_left_pt;
        let col_width = self.setup.usable_width() / columns as f64;

        for row in &table.rows {
            let size = row
                .cells
                .iter()
                .filter_map(|c| c.style.font_size.map(f64::from))
                .fold(TABLE_SIZE, f64::max);
            let height = size + 2.0 * ROW_PADDING;
            let bottom = self.y - height;

            for (col, cell) in row.cells.iter().enumerate() {
                let x = left + col as f64 * col_width;
                if let Some(rgb) = cell.style.shading.as_deref().and_then(parse_color) {
                    self.fill_color(rgb);
                    self.op("re", vec![num(x), num(bottom), num(col_width), num(height)]);
                    self.op("f", vec![]);
                }
                self.op("G", vec![num(0.0)]);
                self.op("w", vec![num(0.5)]);
                self.op("re", vec![num(x), num(bottom), num(col_width), num(height)]);
                self.op("S", vec![]);

                if cell.text.is_empty() {
                    continue;
                }
                let cell_size = cell.style.font_size.map(f64::from).unwrap_or(size);
                let width = text_width(&cell.text, cell_size);
                let text_x = match cell.style.alignment {
                    Alignment::Left => x + ROW_PADDING,
                    Alignment::Center => x + (col_width - width).max(0.0) / 2.0,
                    Alignment::Right => x + (col_width - width - ROW_PADDING).max(0.0),
                };
                let color = cell
                    .style
                    .font_color
                    .as_deref()
                    .and_then(parse_color)
                    .unwrap_or([0.0; 3]);
                self.fill_color(color);
                self.line(
                    text_x,
                    bottom + ROW_PADDING + 1.0,
                    cell_size,
                    &[(cell.text.clone(), cell.style.bold)],
                );
            }
            self.y = bottom;
        }
        self.y -= ROW_PADDING;
    }

    fn picture(&mut self, picture: &Picture) {
        let placement = &picture.placement;
        let width = placement.width_pt.unwrap_or(72.0);
        let height = placement.height_pt.unwrap_or(72.0);
        let bottom = self.setup.height_pt - placement.top_pt - height;

        self.op("G", vec![num(0.6)]);
        self.op("w", vec![num(0.75)]);
        self.op(
            "re",
            vec![num(placement.left_pt), num(bottom), num(width), num(height)],
        );
        self.op("S", vec![]);

        let label = picture
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.fill_color([0.4; 3]);
        self.line(
            placement.left_pt + 2.0,
            bottom + 2.0,
            6.0,
            &[(label, false)],
        );
    }
}

/// Greedy word wrap over the paragraph's runs, keeping each word's weight
fn wrap(paragraph: &Paragraph, size: f64, width: f64) -> Vec<Vec<(String, bool)>> {
    let mut lines: Vec<Vec<(String, bool)>> = Vec::new();
    let mut current: Vec<(String, bool)> = Vec::new();
    let mut current_width = 0.0;

    for run in &paragraph.runs {
        for (i, word) in run.text.split(' ').enumerate() {
            // Runs split mid-word continue the previous segment
            let glue = i > 0 || run.text.starts_with(' ');
            let piece = if glue && !current.is_empty() {
                format!(" {word}")
            } else {
                word.to_string()
            };
            let piece_width = text_width(&piece, size);
            if current_width + piece_width > width && !current.is_empty() && glue {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
                let trimmed = word.to_string();
                current_width += text_width(&trimmed, size);
                current.push((trimmed, run.bold));
                continue;
            }
            current_width += piece_width;
            match current.last_mut() {
                Some((text, bold)) if *bold == run.bold => text.push_str(&piece),
                _ => current.push((piece, run.bold)),
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
