//! Pipeline stages for payslip extraction.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! per page:      split ──▶ ocr ──▶ resolve ──▶ PayslipRecord
//! whole document:          ocr ──▶ llm     ──▶ StructuredPayslips
//! ```
//!
//! 1. [`split`]  : cut the upload into standalone one-page PDFs
//! 2. [`ocr`]    : Document AI call; failures degrade to no entities
//! 3. [`resolve`]: best entity per required field, normalised
//! 4. [`llm`]    : whole-document segmentation by a language model
//! 5. [`retry`]  : backoff loop shared by the collaborator calls

pub mod llm;
pub mod ocr;
pub mod resolve;
pub mod retry;
pub mod split;
