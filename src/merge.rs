//! Concatenation of exported pages into the final document

use lopdf::{Document, Object, ObjectId};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{ErrorCode, ReportError, Result};

/// Merge the PDFs at `paths`, in the given order, into one document
pub fn merge_pdfs(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let documents = paths
        .iter()
        .map(|path| {
            Document::load(path).map_err(|e| {
                ReportError::merge(
                    ErrorCode::MERGE_INVALID_PDF,
                    format!("cannot read {}: {}", path.display(), e),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    merge_documents(documents)
}

/// Merge in-memory PDFs, in the given order
pub fn merge_pdf_bytes(inputs: &[Vec<u8>]) -> Result<Vec<u8>> {
    let documents = inputs
        .iter()
        .enumerate()
        .map(|(i, bytes)| {
            Document::load_mem(bytes).map_err(|e| {
                ReportError::merge(
                    ErrorCode::MERGE_INVALID_PDF,
                    format!("input {} is not a PDF: {}", i + 1, e),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    merge_documents(documents)
}

fn invalid(message: &str) -> ReportError {
    ReportError::merge(ErrorCode::MERGE_INVALID_PDF, message)
}

/// Renumber every document into one id space, keep all non-structural
/// objects, and rebuild a single page tree over the pages in input order
pub fn merge_documents(documents: Vec<Document>) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(ReportError::merge(
            ErrorCode::MERGE_NO_INPUT,
            "there are no pages to merge",
        ));
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: Vec<(ObjectId, Object)> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let page = doc
                .get_object(page_id)
                .map_err(|e| invalid(&format!("page {:?} is unreadable: {}", page_id, e)))?;
            pages.push((page_id, page.clone()));
        }
        objects.extend(doc.objects);
    }

    if pages.is_empty() {
        return Err(ReportError::merge(
            ErrorCode::MERGE_NO_INPUT,
            "the inputs contain no pages",
        ));
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (id, object) in objects {
        match object.type_name().unwrap_or_default() {
            "Catalog" => {
                let keep = catalog.as_ref().map(|(first, _)| *first).unwrap_or(id);
                catalog = Some((keep, object));
            }
            "Pages" => {
                if let Ok(dict) = object.as_dict() {
                    let mut dict = dict.clone();
                    if let Some((_, previous)) = &page_tree {
                        if let Ok(previous) = previous.as_dict() {
                            dict.extend(previous);
                        }
                    }
                    let keep = page_tree.as_ref().map(|(first, _)| *first).unwrap_or(id);
                    page_tree = Some((keep, Object::Dictionary(dict)));
                }
            }
            // Rebuilt below
            "Page" | "Outlines" | "Outline" => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let (tree_id, tree) = page_tree.ok_or_else(|| invalid("no page tree found"))?;
    let (catalog_id, catalog) = catalog.ok_or_else(|| invalid("no catalog found"))?;

    let page_count = pages.len();
    let mut kids = Vec::with_capacity(page_count);
    for (id, page) in pages {
        if let Ok(dict) = page.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", tree_id);
            merged.objects.insert(id, Object::Dictionary(dict));
            kids.push(Object::Reference(id));
        }
    }

    let mut tree = tree
        .as_dict()
        .map_err(|_| invalid("page tree is not a dictionary"))?
        .clone();
    tree.set("Count", page_count as i64);
    tree.set("Kids", kids);
    merged.objects.insert(tree_id, Object::Dictionary(tree));

    let mut catalog = catalog
        .as_dict()
        .map_err(|_| invalid("catalog is not a dictionary"))?
        .clone();
    catalog.set("Pages", tree_id);
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();

    let mut out = Vec::new();
    merged
        .save_to(&mut out)
        .map_err(|e| ReportError::merge(ErrorCode::MERGE_GENERIC, e.to_string()))?;
    debug!("Merged {} pages into {} bytes", page_count, out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::local::{render_pdf, Block, PageDocument, Paragraph};
    use crate::host::PageSetup;

    fn page(width_pt: f64) -> Vec<u8> {
        let doc = PageDocument {
            page: PageSetup {
                width_pt,
                ..Default::default()
            },
            body: vec![Block::Paragraph(Paragraph::plain("Set pieces"))],
            ..Default::default()
        };
        render_pdf(&doc).unwrap()
    }

    fn page_widths(bytes: &[u8]) -> Vec<f32> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let page = doc.get_object(*id).unwrap().as_dict().unwrap();
                let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
                media_box[2].as_float().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_merge_keeps_input_order() {
        let merged = merge_pdf_bytes(&[page(700.0), page(500.0), page(600.0)]).unwrap();
        assert_eq!(page_widths(&merged), vec![700.0, 500.0, 600.0]);
    }

    #[test]
    fn test_merge_single_page() {
        let merged = merge_pdf_bytes(&[page(595.0)]).unwrap();
        assert_eq!(Document::load_mem(&merged).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn test_merge_nothing_fails() {
        let err = merge_pdfs(&[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MERGE_NO_INPUT);
    }

    #[test]
    fn test_merge_rejects_garbage() {
        let err = merge_pdf_bytes(&[b"not a pdf".to_vec()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MERGE_INVALID_PDF);
    }
}
