//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to observe
//! the per-page pipeline as it walks the document.
//!
//! # Example
//!
//! ```rust
//! use payslip_ocr::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FieldCounter {
//!     fields: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for FieldCounter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, fields_found: usize) {
//!         self.fields.fetch_add(fields_found, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(FieldCounter { fields: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the per-page pipeline as it processes each page.
///
/// Pages are processed sequentially, so events for one document arrive in
/// page order. The trait is `Send + Sync` because one extractor serves many
/// concurrent HTTP requests. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the document has been split.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the OCR request is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been resolved.
    ///
    /// `fields_found` is the number of required fields extracted; a page
    /// whose OCR call failed reports 0.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, fields_found: usize) {
        let _ = (page_num, total_pages, fields_found);
    }

    /// Called once after every page has been attempted.
    fn on_extraction_complete(&self, total_pages: usize, pages_with_fields: usize) {
        let _ = (total_pages, pages_with_fields);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
