//! # payslip-ocr
//!
//! Extract structured payslip fields from scanned PDF documents.
//!
//! Uploaded PDFs are split into single pages, each page is sent to a
//! document-understanding service (Google Document AI with a payslip
//! processor), and the returned entities are reduced to a fixed set of
//! payslip fields. An alternate path hands the OCR text of the whole document
//! to a language model, which segments it into logical payslips that may span
//! several pages.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Split    one standalone PDF per page (lopdf, spawn_blocking)
//!  ├─ 2. OCR      Document AI call per page; failures degrade to no entities
//!  ├─ 3. Resolve  highest-confidence entity per required field
//!  └─ 4. Output   one PayslipRecord per page, in page order
//!
//! PDF ─▶ OCR (whole document) ─▶ LLM ─▶ StructuredPayslips
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payslip_ocr::{ExtractionConfig, PayslipExtractor, ProcessorId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .processor(ProcessorId::new("my-project", "eu", "abc123"))
//!         .access_token(std::env::var("DOCAI_ACCESS_TOKEN")?)
//!         .build()?;
//!     let extractor = PayslipExtractor::from_config(config)?;
//!
//!     let bytes = std::fs::read("payslips.pdf")?;
//!     for record in extractor.extract_pages(&bytes).await? {
//!         println!("{}", serde_json::to_string(&record)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `payslip-ocr` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! Library users that only need the pipeline or the router:
//! ```toml
//! payslip-ocr = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ProcessorId, RetryPolicy};
pub use error::{OcrError, PayslipError, StructuringError};
pub use extract::PayslipExtractor;
pub use output::{
    Entity, FieldValue, PayslipNumber, PayslipRecord, StructuredPayslip, StructuredPayslips,
    REQUIRED_FIELDS,
};
pub use pipeline::llm::{LlmStructurer, StructuringProvider};
pub use pipeline::ocr::{DocumentAiClient, DocumentUnderstanding, ProcessedDocument};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::{router, AppState};
