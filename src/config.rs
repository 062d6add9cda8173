//! Configuration types for payslip extraction.
//!
//! Everything the orchestrator needs from the outside world (processor
//! identity, credentials, model choice, retry policy) lives in
//! [`ExtractionConfig`], built via [`ExtractionConfigBuilder`]. The library
//! never reads environment variables on its own: the binary maps flags and
//! env vars onto the builder once at start-up, and tests build configs
//! directly.

use crate::error::PayslipError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default Document AI region.
pub const DEFAULT_LOCATION: &str = "us";

/// Default model for the structuring path when only a provider is named.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1-nano";

/// Identity of a Document AI processor: the project/location/processor triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorId {
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
}

impl ProcessorId {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        processor_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            processor_id: processor_id.into(),
        }
    }

    /// Resource name as used in the REST path:
    /// `projects/{p}/locations/{l}/processors/{id}`.
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/processors/{}",
            self.project_id, self.location, self.processor_id
        )
    }

    /// Regional API endpoint, e.g. `https://eu-documentai.googleapis.com`.
    pub fn default_endpoint(&self) -> String {
        format!("https://{}-documentai.googleapis.com", self.location)
    }

    fn is_complete(&self) -> bool {
        !self.project_id.is_empty() && !self.location.is_empty() && !self.processor_id.is_empty()
    }
}

impl Default for ProcessorId {
    fn default() -> Self {
        Self::new("", DEFAULT_LOCATION, "")
    }
}

/// Retry policy applied around each collaborator call.
///
/// The default performs no retries: a failed page degrades to an empty
/// result on the first error. With `max_retries > 0` the delay doubles after
/// each attempt: `backoff_ms`, `2 * backoff_ms`, `4 * backoff_ms`, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 500,
        }
    }

    /// Delay to wait before `attempt` (1-based; attempt 0 is the first call).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Configuration for a payslip extraction.
///
/// # Example
/// ```rust
/// use payslip_ocr::{ExtractionConfig, ProcessorId};
///
/// let config = ExtractionConfig::builder()
///     .processor(ProcessorId::new("my-project", "eu", "abc123"))
///     .access_token("ya29.token")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_retries, 2);
/// ```
#[derive(Clone, Default)]
pub struct ExtractionConfig {
    /// Document AI processor that understands payslips.
    pub processor: ProcessorId,

    /// OAuth2 bearer token for Document AI (e.g. `gcloud auth print-access-token`).
    pub access_token: Option<String>,

    /// Override for the Document AI endpoint. `None` uses the regional default.
    pub endpoint: Option<String>,

    /// Per-request timeout for Document AI calls. `None` keeps reqwest's default.
    pub request_timeout_secs: Option<u64>,

    /// Retry policy around each collaborator call. Default: no retries.
    pub retry: RetryPolicy,

    /// LLM provider name for the structuring path ("openai", "ollama", …).
    pub llm_provider_name: Option<String>,

    /// LLM model identifier for the structuring path.
    pub llm_model: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `llm_provider_name`.
    pub llm_provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum completion tokens for the structuring call. `None` = provider default.
    pub llm_max_tokens: Option<usize>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("processor", &self.processor)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry", &self.retry)
            .field("llm_provider_name", &self.llm_provider_name)
            .field("llm_model", &self.llm_model)
            .field("llm_provider", &self.llm_provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("llm_max_tokens", &self.llm_max_tokens)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Endpoint the Document AI client should call.
    pub fn documentai_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.processor.default_endpoint())
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.config.fmt(f)
    }
}

impl ExtractionConfigBuilder {
    pub fn processor(mut self, processor: ProcessorId) -> Self {
        self.config.processor = processor;
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.retry.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry.backoff_ms = ms;
        self
    }

    pub fn llm_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider_name = Some(name.into());
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = Some(model.into());
        self
    }

    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.llm_provider = Some(provider);
        self
    }

    pub fn llm_max_tokens(mut self, n: usize) -> Self {
        self.config.llm_max_tokens = Some(n);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The processor triple may be left empty when a custom
    /// [`crate::pipeline::ocr::DocumentUnderstanding`] is injected; it is
    /// checked when the real Document AI client is constructed.
    pub fn build(self) -> Result<ExtractionConfig, PayslipError> {
        let c = &self.config;
        if c.request_timeout_secs == Some(0) {
            return Err(PayslipError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref endpoint) = c.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(PayslipError::InvalidConfig(format!(
                    "Endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        if c.llm_max_tokens == Some(0) {
            return Err(PayslipError::InvalidConfig(
                "LLM max tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Check that the processor triple is fully specified.
pub(crate) fn require_processor(config: &ExtractionConfig) -> Result<&ProcessorId, PayslipError> {
    if config.processor.is_complete() {
        Ok(&config.processor)
    } else {
        Err(PayslipError::ProviderNotConfigured {
            provider: "document-ai".to_string(),
            hint: "Set DOCAI_PROJECT_ID, DOCAI_LOCATION and DOCAI_PROCESSOR_ID \
                   (or pass --project-id/--location/--processor-id)."
                .to_string(),
        })
    }
}
