//! HTTP API for payslip extraction.
//!
//! ## Endpoints
//!
//! - `POST /api/ocr`: multipart field `file`; one record per page
//! - `POST /api/ocr/structured`: multipart field `file`; payslips segmented by the LLM
//! - `GET /health`: liveness and version
//!
//! ## Error bodies
//!
//! | Status | Body | When |
//! |--------|------|------|
//! | 400 | `{"error": …}` | no `file` field, empty filename, empty file, not multipart |
//! | 413 | `{"error": …}` | upload larger than the configured limit |
//! | 500 | `{"error": …, "details": …}` | anything else (malformed PDF, provider missing, …) |

use crate::error::PayslipError;
use crate::extract::PayslipExtractor;
use crate::output::{PayslipRecord, StructuredPayslips};
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Default upload limit: 25 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const UPLOAD_FIELD: &str = "file";

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<PayslipExtractor>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(extractor: PayslipExtractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

/// Build the router with every endpoint.
pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/api/ocr", post(ocr_handler))
        .route("/api/ocr/structured", post(structured_handler))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400: nothing usable was uploaded.
    #[error("No file provided")]
    NoFileProvided,

    /// The multipart body could not be read (size limit, truncated stream).
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    /// 500: the extraction failed after the upload was accepted.
    #[error("{message}")]
    Internal { message: String, details: String },
}

impl From<PayslipError> for ApiError {
    fn from(e: PayslipError) -> Self {
        match e {
            PayslipError::NoFileProvided => ApiError::NoFileProvided,
            other => ApiError::Internal {
                message: "An internal error occurred while processing the document".to_string(),
                details: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NoFileProvided => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": ApiError::NoFileProvided.to_string() })),
            )
                .into_response(),
            ApiError::Upload { status, message } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal { message, details } => {
                error!("Request failed: {} — {}", message, details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message, "details": details })),
                )
                    .into_response()
            }
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[tracing::instrument(skip_all)]
async fn ocr_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<PayslipRecord>>, ApiError> {
    let upload = read_upload(multipart).await?;
    info!(filename = %upload.filename, bytes = upload.bytes.len(), "Received document");

    let records = state.extractor.extract_pages(&upload.bytes).await?;
    Ok(Json(records))
}

#[tracing::instrument(skip_all)]
async fn structured_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StructuredPayslips>, ApiError> {
    let upload = read_upload(multipart).await?;
    info!(filename = %upload.filename, bytes = upload.bytes.len(), "Received document for structuring");

    let result = state.extractor.extract_structured(&upload.bytes).await?;
    Ok(Json(result))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::NoFileProvided)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Upload {
        status: e.status(),
        message: e.body_text(),
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ApiError::NoFileProvided),
        };
        let bytes = field.bytes().await.map_err(|e| ApiError::Upload {
            status: e.status(),
            message: e.body_text(),
        })?;

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::NoFileProvided)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_maps_to_bad_request() {
        let resp = ApiError::from(PayslipError::NoFileProvided).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn malformed_document_maps_to_internal_error_with_details() {
        let err = ApiError::from(PayslipError::MalformedDocument {
            detail: "invalid file header".into(),
        });
        match &err {
            ApiError::Internal { details, .. } => assert!(details.contains("invalid file header")),
            other => panic!("expected Internal, got {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
