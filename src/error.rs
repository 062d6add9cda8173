//! Error types for the payslip-ocr library.
//!
//! Three error types reflect three failure scopes:
//!
//! * [`PayslipError`]: **Fatal**: the request cannot proceed at all (no
//!   upload, unparseable PDF, provider not configured). Returned as
//!   `Err(PayslipError)` from the top-level `extract_*` methods.
//!
//! * [`OcrError`]: **Per page**: the document-understanding call for one page
//!   failed. Logged by [`crate::pipeline::ocr::extract_entities`] and
//!   degraded to an empty entity list; it never reaches the caller.
//!
//! * [`StructuringError`]: **Per document, LLM path**: the model call failed
//!   or its output was not valid JSON. Degraded into
//!   [`crate::output::StructuredPayslips::error`].

use thiserror::Error;

/// All fatal errors returned by the payslip-ocr library.
#[derive(Debug, Error)]
pub enum PayslipError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No file was uploaded, or the uploaded file was empty.
    #[error("No file provided")]
    NoFileProvided,

    /// The upload could not be parsed as a PDF, or it has no pages.
    #[error("Malformed document: {detail}")]
    MalformedDocument { detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// A collaborator (Document AI, LLM) could not be constructed.
    #[error("Provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the document-understanding service.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// Connection refused, DNS failure, TLS error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON document.
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// A failed whole-document structuring call.
#[derive(Debug, Clone, Error)]
pub enum StructuringError {
    /// The language model could not be reached or refused the request.
    #[error("LLM call failed: {0}")]
    Provider(String),

    /// The completion did not contain any `{...}` span.
    #[error("no JSON object found in model response")]
    NoJsonObject,

    /// The `{...}` span was not valid JSON.
    #[error("invalid JSON in model response: {0}")]
    InvalidJson(String),

    /// Valid JSON, but not shaped like the payslip schema.
    #[error("model response does not match the payslip schema: {0}")]
    Schema(String),
}
