//! Extraction entry points: the per-page pipeline and the whole-document
//! structuring path.
//!
//! A [`PayslipExtractor`] owns its configuration and its two collaborators
//! (a [`DocumentUnderstanding`] service and, optionally, a
//! [`StructuringProvider`]). It holds no per-request state, so one instance
//! is shared behind an `Arc` by every HTTP request.
//!
//! Pages are processed one at a time, in order. Output order always matches
//! input order and at most one OCR call is in flight per request.

use crate::config::ExtractionConfig;
use crate::error::PayslipError;
use crate::output::{PayslipRecord, StructuredPayslips};
use crate::pipeline::llm::{structure_text, LlmStructurer, StructuringProvider};
use crate::pipeline::ocr::{extract_entities, DocumentAiClient, DocumentUnderstanding};
use crate::pipeline::retry::with_retry;
use crate::pipeline::{resolve, split};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs payslip extractions against injected collaborators.
pub struct PayslipExtractor {
    config: ExtractionConfig,
    ocr: Arc<dyn DocumentUnderstanding>,
    structurer: Option<Arc<dyn StructuringProvider>>,
}

impl PayslipExtractor {
    /// Build an extractor around an explicit document-understanding service.
    pub fn new(config: ExtractionConfig, ocr: Arc<dyn DocumentUnderstanding>) -> Self {
        Self {
            config,
            ocr,
            structurer: None,
        }
    }

    /// Enable the whole-document structuring path.
    pub fn with_structurer(mut self, structurer: Arc<dyn StructuringProvider>) -> Self {
        self.structurer = Some(structurer);
        self
    }

    /// Build the production extractor: Document AI for OCR and, when an LLM
    /// is configured, an `edgequake-llm` provider for structuring.
    ///
    /// # Errors
    /// [`PayslipError::ProviderNotConfigured`] when the Document AI processor
    /// triple is incomplete or a named LLM provider cannot be created.
    pub fn from_config(config: ExtractionConfig) -> Result<Self, PayslipError> {
        let ocr: Arc<dyn DocumentUnderstanding> = Arc::new(DocumentAiClient::new(&config)?);
        let mut extractor = Self::new(config, ocr);

        match resolve_llm_provider(&extractor.config)? {
            Some(provider) => {
                let structurer = LlmStructurer::new(provider, extractor.config.llm_max_tokens);
                extractor = extractor.with_structurer(Arc::new(structurer));
            }
            None => info!("No LLM configured; structured extraction disabled"),
        }

        Ok(extractor)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// `true` when [`Self::extract_structured`] can be used.
    pub fn has_structurer(&self) -> bool {
        self.structurer.is_some()
    }

    /// Extract one [`PayslipRecord`] per page.
    ///
    /// Record `i` (1-based) has `payslip_number = i` and `page_range = "i-i"`.
    /// A page whose OCR call fails gets an empty `extracted_data`; the other
    /// pages are unaffected.
    ///
    /// # Errors
    /// - [`PayslipError::NoFileProvided`] for an empty upload
    /// - [`PayslipError::MalformedDocument`] when the upload is not a PDF
    pub async fn extract_pages(&self, document: &[u8]) -> Result<Vec<PayslipRecord>, PayslipError> {
        let total_start = Instant::now();
        if document.is_empty() {
            return Err(PayslipError::NoFileProvided);
        }

        // ── Step 1: Split into single pages ──────────────────────────────
        let pages = split::split_pages(document.to_vec()).await?;
        let total_pages = pages.len();
        info!("Extracting payslip fields from {} pages", total_pages);

        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_extraction_start(total_pages);
        }

        // ── Step 2: OCR + resolve, one page at a time ────────────────────
        let mut records = Vec::with_capacity(total_pages);
        for page in &pages {
            if let Some(cb) = progress {
                cb.on_page_start(page.page_num, total_pages);
            }

            let entities =
                extract_entities(self.ocr.as_ref(), page.page_num, &page.bytes, &self.config.retry)
                    .await;
            let fields = resolve::resolve_entities(&entities);
            debug!(
                "Page {}: {} entities → {} fields",
                page.page_num,
                entities.len(),
                fields.len()
            );

            if let Some(cb) = progress {
                cb.on_page_complete(page.page_num, total_pages, fields.len());
            }
            records.push(PayslipRecord::for_page(page.page_num, fields));
        }

        // ── Step 3: Report ───────────────────────────────────────────────
        let with_fields = records
            .iter()
            .filter(|r| !r.extracted_data.is_empty())
            .count();
        if let Some(cb) = progress {
            cb.on_extraction_complete(total_pages, with_fields);
        }
        info!(
            "Extraction complete: {}/{} pages with fields, {}ms total",
            with_fields,
            total_pages,
            total_start.elapsed().as_millis()
        );

        Ok(records)
    }

    /// Extract logical payslips from the whole document with the LLM.
    ///
    /// The document is OCR'd once as a whole and its text handed to the
    /// structuring provider in a single call. OCR and model failures are
    /// reported through [`StructuredPayslips::error`], not as `Err`.
    ///
    /// # Errors
    /// - [`PayslipError::NoFileProvided`] for an empty upload
    /// - [`PayslipError::MalformedDocument`] when the upload is not a PDF
    /// - [`PayslipError::ProviderNotConfigured`] when no LLM is configured
    pub async fn extract_structured(&self, document: &[u8]) -> Result<StructuredPayslips, PayslipError> {
        let total_start = Instant::now();
        if document.is_empty() {
            return Err(PayslipError::NoFileProvided);
        }
        let structurer = self
            .structurer
            .as_ref()
            .ok_or_else(|| PayslipError::ProviderNotConfigured {
                provider: "llm".to_string(),
                hint: "Set PAYSLIP_LLM_PROVIDER (and optionally PAYSLIP_LLM_MODEL) to enable \
                       structured extraction."
                    .to_string(),
            })?;

        let total_pages = split::count_pages(document.to_vec()).await?;
        info!("Structuring {}-page document", total_pages);

        let ocr = self.ocr.as_ref();
        let text = match with_retry(&self.config.retry, "Document OCR", || ocr.process(document)).await {
            Ok(doc) => doc.text,
            Err(e) => {
                warn!("Document OCR failed — {}", e);
                return Ok(StructuredPayslips::failed(format!("OCR failed: {e}")));
            }
        };
        if text.trim().is_empty() {
            warn!("Document OCR returned no text");
            return Ok(StructuredPayslips::failed("OCR returned no text"));
        }

        let result = structure_text(structurer.as_ref(), &text).await;
        info!(
            "Structured extraction complete: {} payslips, {}ms total",
            result.payslips.len(),
            total_start.elapsed().as_millis()
        );
        Ok(result)
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.llm_provider`): used as-is.
/// 2. **Named provider** (`config.llm_provider_name`): created through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key (`OPENAI_API_KEY`, …) or local endpoint (Ollama) itself.
/// 3. Neither set: structuring is disabled (`Ok(None)`).
fn resolve_llm_provider(
    config: &ExtractionConfig,
) -> Result<Option<Arc<dyn LLMProvider>>, PayslipError> {
    if let Some(ref provider) = config.llm_provider {
        return Ok(Some(Arc::clone(provider)));
    }

    let Some(ref name) = config.llm_provider_name else {
        return Ok(None);
    };
    let model = config
        .llm_model
        .as_deref()
        .unwrap_or(crate::config::DEFAULT_LLM_MODEL);

    ProviderFactory::create_llm_provider(name, model)
        .map(Some)
        .map_err(|e| PayslipError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        })
}
