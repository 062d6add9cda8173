//! Shared fixtures: in-memory PDFs and scripted collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object, Stream};
use payslip_ocr::{DocumentUnderstanding, Entity, OcrError, ProcessedDocument, StructuringError, StructuringProvider};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Text drawn on page `n` of [`sample_pdf`].
pub fn page_marker(n: usize) -> String {
    format!("Payslip page {n}")
}

/// A valid PDF with `page_count` pages, each showing [`page_marker`].
pub fn sample_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=page_count {
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", page_marker(n));
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("fixture PDF must serialise");
    buf
}

/// Concatenated content streams of every page, in order.
pub fn pdf_text(bytes: &[u8]) -> String {
    let doc = Document::load_mem(bytes).expect("fake OCR received an unreadable PDF");
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap_or_default()).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Page numbers whose marker appears in `text`.
fn pages_in(text: &str, max: usize) -> Vec<usize> {
    (1..=max)
        .filter(|&n| text.contains(&format!("({})", page_marker(n))))
        .collect()
}

/// Document-understanding fake keyed by page marker.
///
/// Pages with no script return no entities; pages scripted to fail return
/// an [`OcrError::Status`]. The returned `text` is the PDF's own content.
#[derive(Default)]
pub struct ScriptedOcr {
    entities: HashMap<usize, Vec<Entity>>,
    failing: Vec<usize>,
    pub calls: AtomicUsize,
    pub seen_pages: Mutex<Vec<Vec<usize>>>,
}

impl ScriptedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, n: usize, entities: Vec<Entity>) -> Self {
        self.entities.insert(n, entities);
        self
    }

    pub fn failing_page(mut self, n: usize) -> Self {
        self.failing.push(n);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentUnderstanding for ScriptedOcr {
    async fn process(&self, pdf: &[u8]) -> Result<ProcessedDocument, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = pdf_text(pdf);
        let pages = pages_in(&text, 64);
        self.seen_pages.lock().unwrap().push(pages.clone());

        if pages.iter().any(|p| self.failing.contains(p)) {
            return Err(OcrError::Status {
                status: 503,
                body: "processor unavailable".into(),
            });
        }

        let entities = pages
            .iter()
            .flat_map(|p| self.entities.get(p).cloned().unwrap_or_default())
            .collect();
        Ok(ProcessedDocument { text, entities })
    }
}

/// Structuring fake that replies with a fixed string.
pub struct CannedLlm {
    reply: String,
    pub seen_user: Mutex<Option<String>>,
}

impl CannedLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            seen_user: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StructuringProvider for CannedLlm {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, StructuringError> {
        *self.seen_user.lock().unwrap() = Some(user.to_string());
        Ok(self.reply.clone())
    }
}
