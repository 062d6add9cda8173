//! LLM structuring: turn a whole document's OCR text into payslip records.
//!
//! One model call per document. The model is asked (see [`crate::prompts`])
//! to segment the text into payslips, merge multi-page payslips and return a
//! single JSON object. The reply is recovered with a deliberately simple
//! heuristic: take everything from the first `{` to the last `}` and
//! strict-parse it. This tolerates commentary or code fences around the
//! object, but not two separate JSON objects in one reply.
//!
//! [`structure_text`] never returns an error: every failure becomes a
//! [`StructuredPayslips`] with an empty list and an `error` message. It does
//! not retry, and a reply that fails to parse contributes nothing.

use crate::error::StructuringError;
use crate::output::{PayslipNumber, StructuredPayslip, StructuredPayslips, REQUIRED_FIELDS};
use crate::prompts::{structuring_user_prompt, STRUCTURING_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A chat-completion capability: system + user prompt in, raw text out.
#[async_trait]
pub trait StructuringProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, StructuringError>;
}

/// [`StructuringProvider`] backed by any `edgequake-llm` provider.
pub struct LlmStructurer {
    provider: Arc<dyn LLMProvider>,
    max_tokens: Option<usize>,
}

impl LlmStructurer {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: Option<usize>) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait]
impl StructuringProvider for LlmStructurer {
    async fn complete(&self, system: &str, user: &str) -> Result<String, StructuringError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let options = build_options(self.max_tokens);

        let start = Instant::now();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| StructuringError::Provider(e.to_string()))?;

        debug!(
            "Structuring call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Deterministic sampling and JSON-object response mode.
fn build_options(max_tokens: Option<usize>) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(0.0),
        max_tokens,
        response_format: Some("json_object".to_string()),
        ..Default::default()
    }
}

/// Ask the model to segment `document_text` into payslips.
pub async fn structure_text(
    provider: &dyn StructuringProvider,
    document_text: &str,
) -> StructuredPayslips {
    let user = structuring_user_prompt(document_text);

    let raw = match provider.complete(STRUCTURING_SYSTEM_PROMPT, &user).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Structuring failed — {}", e);
            return StructuredPayslips::failed(e.to_string());
        }
    };

    match parse_structured_response(&raw) {
        Ok(payslips) => {
            info!("Model identified {} payslips", payslips.len());
            StructuredPayslips {
                payslips,
                error: None,
            }
        }
        Err(e) => {
            warn!("Could not parse model response — {}", e);
            StructuredPayslips::failed(e.to_string())
        }
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

static RE_JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// The span from the first `{` to the last `}`, if any.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    RE_JSON_OBJECT.find(raw).map(|m| m.as_str())
}

#[derive(Debug, Deserialize)]
struct WirePayslips {
    payslips: Vec<Map<String, Value>>,
}

/// Recover, parse and conform the model's reply.
///
/// Each payslip may carry its fields under `extracted_data` or directly on
/// the payslip object. Every required field ends up present (missing ones
/// as `null`) and keys outside the schema are dropped.
pub fn parse_structured_response(raw: &str) -> Result<Vec<StructuredPayslip>, StructuringError> {
    let blob = extract_json_object(raw).ok_or(StructuringError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(blob).map_err(|e| StructuringError::InvalidJson(e.to_string()))?;
    let wire: WirePayslips =
        serde_json::from_value(value).map_err(|e| StructuringError::Schema(e.to_string()))?;

    wire.payslips
        .into_iter()
        .enumerate()
        .map(|(i, p)| conform(i + 1, p))
        .collect()
}

fn conform(position: usize, mut payslip: Map<String, Value>) -> Result<StructuredPayslip, StructuringError> {
    let payslip_number = match payslip.remove("payslip_number") {
        None | Some(Value::Null) => PayslipNumber::from(position),
        Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
            debug!("Payslip {}: unusable payslip_number ({}), using position", position, e);
            PayslipNumber::from(position)
        }),
    };
    let page_range = match payslip.remove("page_range") {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };

    // Flat payslips carry their fields next to payslip_number.
    let mut data = match payslip.remove("extracted_data") {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => payslip,
        Some(other) => {
            return Err(StructuringError::Schema(format!(
                "payslip {position}: extracted_data must be an object, got {other}"
            )))
        }
    };

    let mut extracted = BTreeMap::new();
    for field in REQUIRED_FIELDS {
        extracted.insert(field.to_string(), data.remove(field).unwrap_or(Value::Null));
    }
    if !data.is_empty() {
        debug!(
            "Payslip {}: dropping fields outside the schema: {:?}",
            position,
            data.keys().collect::<Vec<_>>()
        );
    }

    Ok(StructuredPayslip {
        payslip_number,
        page_range,
        extracted_data: extracted,
    })
}
