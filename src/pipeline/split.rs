//! Page splitting: one multi-page PDF in, one standalone PDF per page out.
//!
//! Each output is produced by cloning the parsed document, hanging the kept
//! page directly under the root page-tree node and pruning every object that
//! is no longer reachable. Attributes the page inherited from intermediate
//! page-tree nodes (`Resources`, `MediaBox`, `CropBox`, `Rotate`) are copied
//! onto the page first, so it renders the same without its old ancestors.
//! Content streams, fonts and images are carried over object for object.
//!
//! Parsing and serialising are CPU-bound; [`split_pages`] runs them inside
//! `spawn_blocking` so a large upload does not stall the async workers.

use crate::error::PayslipError;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, info};

/// Page attributes a page may inherit from its page-tree ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A single page cut out of the uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBuffer {
    /// 1-indexed position in the original document.
    pub page_num: usize,
    /// A complete one-page PDF.
    pub bytes: Vec<u8>,
}

/// Split `bytes` into one-page PDFs, in original page order.
pub async fn split_pages(bytes: Vec<u8>) -> Result<Vec<PageBuffer>, PayslipError> {
    tokio::task::spawn_blocking(move || split_pages_blocking(&bytes))
        .await
        .map_err(|e| PayslipError::Internal(format!("Split task panicked: {}", e)))?
}

/// Parse `bytes` and return the page count without splitting.
pub async fn count_pages(bytes: Vec<u8>) -> Result<usize, PayslipError> {
    tokio::task::spawn_blocking(move || load(&bytes).map(|doc| doc.get_pages().len()))
        .await
        .map_err(|e| PayslipError::Internal(format!("Page count task panicked: {}", e)))?
}

/// Load a PDF that has at least one page.
fn load(bytes: &[u8]) -> Result<Document, PayslipError> {
    let document = Document::load_mem(bytes).map_err(|e| PayslipError::MalformedDocument {
        detail: e.to_string(),
    })?;
    if document.get_pages().is_empty() {
        return Err(PayslipError::MalformedDocument {
            detail: "document has no pages".to_string(),
        });
    }
    Ok(document)
}

/// Blocking implementation of [`split_pages`].
pub fn split_pages_blocking(bytes: &[u8]) -> Result<Vec<PageBuffer>, PayslipError> {
    let document = load(bytes)?;
    let pages = document.get_pages();
    info!("PDF loaded: {} pages", pages.len());

    let root = root_pages_id(&document).map_err(|e| malformed("page tree", e))?;

    let mut results = Vec::with_capacity(pages.len());
    for (&page_num, &page_id) in &pages {
        let context = || format!("page {page_num}");
        let inherited = inherited_attributes(&document, page_id)
            .map_err(|e| malformed(context(), e))?;

        let mut single = document.clone();
        isolate_page(&mut single, root, page_id, inherited)
            .map_err(|e| malformed(context(), e))?;
        single.prune_objects();

        let mut buf = Vec::new();
        single
            .save_to(&mut buf)
            .map_err(|e| malformed(context(), e))?;

        debug!("Split page {} → {} bytes", page_num, buf.len());
        results.push(PageBuffer {
            page_num: page_num as usize,
            bytes: buf,
        });
    }

    Ok(results)
}

fn malformed(context: impl Display, e: impl Display) -> PayslipError {
    PayslipError::MalformedDocument {
        detail: format!("{context}: {e}"),
    }
}

fn root_pages_id(document: &Document) -> lopdf::Result<ObjectId> {
    document.catalog()?.get(b"Pages")?.as_reference()
}

/// Values the page does not set itself, taken from its nearest ancestor.
fn inherited_attributes(
    document: &Document,
    page_id: ObjectId,
) -> lopdf::Result<Vec<(&'static [u8], Object)>> {
    let page = document.get_dictionary(page_id)?;
    let mut missing: Vec<&'static [u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();

    let mut found = Vec::new();
    let mut visited = HashSet::from([page_id]);
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(node_id) = parent {
        if missing.is_empty() || !visited.insert(node_id) {
            break;
        }
        let node = document.get_dictionary(node_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((*key, value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(found)
}

/// Make `page_id` the only kid of the root page-tree node.
fn isolate_page(
    document: &mut Document,
    root: ObjectId,
    page_id: ObjectId,
    inherited: Vec<(&'static [u8], Object)>,
) -> lopdf::Result<()> {
    let page = document.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    page.set("Parent", root);

    let tree = document.get_dictionary_mut(root)?;
    tree.set("Kids", vec![Object::Reference(page_id)]);
    tree.set("Count", 1i64);
    Ok(())
}
