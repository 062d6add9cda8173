//! Document understanding: send a PDF to Google Document AI and read back
//! the typed entities.
//!
//! The pipeline talks to the service through the [`DocumentUnderstanding`]
//! trait so tests (and alternative backends) can substitute a deterministic
//! fake. [`DocumentAiClient`] is the production implementation over the
//! Document AI REST API.
//!
//! ## Failure policy
//!
//! [`extract_entities`] never returns an error. A page whose OCR call fails
//! is logged and contributes an empty entity list, so one bad page cannot
//! abort the rest of the document.

use crate::config::{require_processor, ExtractionConfig, RetryPolicy};
use crate::error::{OcrError, PayslipError};
use crate::output::Entity;
use crate::pipeline::retry::with_retry;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const PDF_MIME_TYPE: &str = "application/pdf";

/// What the document-understanding service returns for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedDocument {
    /// Full OCR text in reading order.
    pub text: String,
    pub entities: Vec<Entity>,
}

/// A document-understanding capability: PDF bytes in, text and entities out.
#[async_trait]
pub trait DocumentUnderstanding: Send + Sync {
    async fn process(&self, pdf: &[u8]) -> Result<ProcessedDocument, OcrError>;
}

/// Run OCR on one page and return its entities.
///
/// Any error, after the retry policy is exhausted, is logged and turned into
/// an empty list.
pub async fn extract_entities(
    provider: &dyn DocumentUnderstanding,
    page_num: usize,
    page: &[u8],
    retry: &RetryPolicy,
) -> Vec<Entity> {
    let label = format!("Page {page_num} OCR");
    match with_retry(retry, &label, || provider.process(page)).await {
        Ok(doc) => {
            debug!("Page {}: {} entities", page_num, doc.entities.len());
            doc.entities
        }
        Err(e) => {
            warn!("Page {}: OCR failed, continuing with no entities — {}", page_num, e);
            Vec::new()
        }
    }
}

// ── Document AI REST client ──────────────────────────────────────────────

/// Calls `:process` on a Document AI processor.
pub struct DocumentAiClient {
    http: reqwest::Client,
    url: String,
    access_token: Option<String>,
    timeout_secs: Option<u64>,
}

impl DocumentAiClient {
    /// Build a client for the processor named in `config`.
    ///
    /// Fails with [`PayslipError::ProviderNotConfigured`] when the processor
    /// triple is incomplete.
    pub fn new(config: &ExtractionConfig) -> Result<Self, PayslipError> {
        let processor = require_processor(config)?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| PayslipError::Internal(format!("HTTP client: {e}")))?;

        let url = format!(
            "{}/v1/{}:process",
            config.documentai_endpoint(),
            processor.resource_name()
        );
        debug!("Document AI endpoint: {}", url);

        Ok(Self {
            http,
            url,
            access_token: config.access_token.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// The fully-qualified `:process` URL this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DocumentUnderstanding for DocumentAiClient {
    async fn process(&self, pdf: &[u8]) -> Result<ProcessedDocument, OcrError> {
        let body = ProcessRequest {
            raw_document: RawDocument {
                content: STANDARD.encode(pdf),
                mime_type: PDF_MIME_TYPE,
            },
            skip_human_review: true,
        };

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ProcessResponse = response
            .json()
            .await
            .map_err(|e| OcrError::Decode(e.to_string()))?;

        Ok(parsed.into())
    }
}

impl DocumentAiClient {
    fn transport_error(&self, e: reqwest::Error) -> OcrError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => OcrError::Timeout { secs },
            _ => OcrError::Transport(e.to_string()),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
    skip_human_review: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String,
    mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: Option<WireDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct WireDocument {
    #[serde(default)]
    text: String,
    #[serde(default)]
    entities: Vec<WireEntity>,
}

/// Document AI omits `mentionText` and `confidence` when they are empty/zero.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntity {
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    mention_text: String,
    #[serde(default)]
    confidence: f32,
}

impl From<ProcessResponse> for ProcessedDocument {
    fn from(resp: ProcessResponse) -> Self {
        let doc = resp.document.unwrap_or_default();
        ProcessedDocument {
            text: doc.text,
            entities: doc
                .entities
                .into_iter()
                .map(|e| Entity::new(e.entity_type, e.mention_text, e.confidence))
                .collect(),
        }
    }
}
