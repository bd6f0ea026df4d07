//! Generation provider adapter.
//!
//! Issues single requests against the external generation service and
//! returns raw text or an embedding vector. The adapter knows nothing about
//! retries or typed validation; response schemas pass through it onto the
//! wire (closed against extra keys) and raw output text comes back.
//!
//! Any transport or provider-side failure is surfaced as an
//! [`AdapterError`] carrying a human-readable message, never a parsed
//! payload and never a panic.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::AdapterError;
use crate::schema::close_schema;

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

/// Hard floor on `max_output_tokens` enforced by the provider. Values below
/// it are clamped up, not rejected.
pub const MIN_OUTPUT_TOKENS: u32 = 16;

/// Default name of the wire-level schema envelope.
pub const DEFAULT_SCHEMA_NAME: &str = "response_output";

/// Placeholder substituted for empty embedding input; empty embeddings are
/// not a supported state.
const EMPTY_EMBEDDING_PLACEHOLDER: &str = "this is blank";

/// Latency/cost trade-off for a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Minimal,
    Standard,
    High,
}

impl ReasoningEffort {
    /// The value submitted on the wire, which accepts
    /// `minimal | low | medium | high`.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "medium",
            Self::High => "high",
        }
    }
}

/// Requested response length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Low,
    Medium,
    High,
}

impl Verbosity {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Per-request generation options.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub reasoning_effort: ReasoningEffort,
    pub verbosity: Verbosity,
    /// Upper bound on response tokens; clamped to [`MIN_OUTPUT_TOKENS`].
    pub max_output_tokens: Option<u32>,
    /// When present, the provider is instructed to emit only JSON conforming
    /// to this structural description.
    pub response_schema: Option<Value>,
    /// Name of the schema envelope on the wire.
    pub schema_name: Option<String>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options requesting structured output against `schema`.
    pub fn with_schema(schema: Value) -> Self {
        Self {
            response_schema: Some(schema),
            ..Self::default()
        }
    }

    /// `max_output_tokens` with the provider's floor applied.
    pub fn effective_max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens.map(|t| t.max(MIN_OUTPUT_TOKENS))
    }
}

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

/// Abstract seam over the generation service.
///
/// The orchestrator depends on this trait, so tests can substitute stub
/// providers without any network access.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Issue a single generation request and return the raw output text.
    async fn request(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AdapterError>;

    /// Return a fixed-dimensionality embedding vector for `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// HTTP client for the generation service's Responses and Embeddings APIs.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl GenerationClient {
    /// Build a client from the given configuration.
    ///
    /// Timeouts are enforced here by the underlying transport; callers see a
    /// timed-out request as an ordinary adapter error.
    pub fn new(config: ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Build the request body for the Responses API.
    pub fn build_request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let mut text_config = json!({ "verbosity": options.verbosity.as_wire_str() });
        if let Some(schema) = &options.response_schema {
            let name = options
                .schema_name
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEMA_NAME.to_string());
            text_config["format"] = json!({
                "type": "json_schema",
                "name": name,
                "schema": close_schema(schema.clone()),
                "strict": true
            });
        }

        let mut body = json!({
            "model": self.config.model,
            "input": prompt,
            "reasoning": { "effort": options.reasoning_effort.as_wire_str() },
            "text": text_config,
        });
        if let Some(max_tokens) = options.effective_max_output_tokens() {
            body["max_output_tokens"] = json!(max_tokens);
        }
        body
    }

    /// Fixed pre-request pause used as crude rate limiting.
    async fn throttle(&self) {
        if self.config.request_pause_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_pause_ms)).await;
        }
    }

    /// Extract output text from a Responses API payload.
    ///
    /// Prefers the flattened `output_text` field and falls back to walking
    /// `output[]` message items.
    fn extract_output_text(response: &Value) -> Option<String> {
        if let Some(text) = response.get("output_text").and_then(|t| t.as_str()) {
            return Some(text.to_string());
        }

        let items = response.get("output")?.as_array()?;
        let text: String = items
            .iter()
            .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("message"))
            .filter_map(|item| {
                item.get("content")
                    .and_then(|c| c.get(0))
                    .and_then(|c| c.get("text"))
                    .and_then(|t| t.as_str())
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn bearer_token(&self) -> Result<&str, AdapterError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AdapterError::new("no API key configured"))
    }
}

/// Truncate an error payload for log-sized messages.
fn truncate_for_message(text: &str) -> String {
    text.chars().take(500).collect()
}

#[async_trait]
impl GenerationProvider for GenerationClient {
    async fn request(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, AdapterError> {
        self.throttle().await;

        let call_id = Uuid::new_v4();
        log::debug!(
            "generation request: model={}, call_id={}, schema={}, prompt_len={}",
            self.config.model,
            call_id,
            options.response_schema.is_some(),
            prompt.len(),
        );

        let token = self.bearer_token()?;
        let body = self.build_request_body(prompt, options);
        let endpoint = format!("{}/responses", self.config.api_base_url());

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::new(format!("transport error: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| AdapterError::new(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            log::warn!("generation request failed: call_id={call_id}, status={status}");
            return Err(AdapterError::new(format!(
                "generation request failed ({}): {}",
                status,
                truncate_for_message(&response_text)
            )));
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            AdapterError::new(format!("unreadable provider response: {e}"))
        })?;

        Self::extract_output_text(&response_json)
            .ok_or_else(|| AdapterError::new("no output text in provider response"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        let input = sanitize_embedding_input(text);

        let token = self.bearer_token()?;
        let body = json!({
            "input": [input],
            "model": self.config.embedding_model,
        });
        let endpoint = format!("{}/embeddings", self.config.api_base_url());

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::new(format!("transport error: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| AdapterError::new(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(AdapterError::new(format!(
                "embedding request failed ({}): {}",
                status,
                truncate_for_message(&response_text)
            )));
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
            AdapterError::new(format!("unreadable provider response: {e}"))
        })?;

        let embedding = response_json
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| AdapterError::new("no embedding in provider response"))?;

        embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| AdapterError::new("non-numeric value in embedding vector"))
            })
            .collect()
    }
}

/// Normalize embedding input the way [`GenerationClient::embed`] does.
///
/// Exposed for callers that pre-process text before batching.
pub fn sanitize_embedding_input(text: &str) -> String {
    let flattened = text.replace('\n', " ");
    if flattened.is_empty() {
        EMPTY_EMBEDDING_PLACEHOLDER.to_string()
    } else {
        flattened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CognitiveFunction;

    fn client() -> GenerationClient {
        GenerationClient::new(ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_request_body_minimal() {
        let body = client().build_request_body("hello", &GenerationOptions::new());
        assert_eq!(body["model"], crate::config::DEFAULT_MODEL);
        assert_eq!(body["input"], "hello");
        assert_eq!(body["reasoning"]["effort"], "minimal");
        assert_eq!(body["text"]["verbosity"], "low");
        assert!(body.get("max_output_tokens").is_none());
        assert!(body["text"].get("format").is_none());
    }

    #[test]
    fn test_request_body_clamps_max_output_tokens() {
        let options = GenerationOptions {
            max_output_tokens: Some(4),
            ..GenerationOptions::default()
        };
        let body = client().build_request_body("hello", &options);
        assert_eq!(body["max_output_tokens"], 16);

        let options = GenerationOptions {
            max_output_tokens: Some(150),
            ..GenerationOptions::default()
        };
        let body = client().build_request_body("hello", &options);
        assert_eq!(body["max_output_tokens"], 150);
    }

    #[test]
    fn test_request_body_schema_envelope() {
        let schema = CognitiveFunction::WakeUpHour.schema().clone();
        let options = GenerationOptions::with_schema(schema);
        let body = client().build_request_body("hello", &options);

        let format = &body["text"]["format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["name"], DEFAULT_SCHEMA_NAME);
        assert_eq!(format["strict"], true);
        assert_eq!(format["schema"]["additionalProperties"], false);
    }

    #[test]
    fn test_request_body_closes_open_schemas() {
        // A caller-supplied schema without additionalProperties is closed
        // at every level before submission.
        let open = json!({
            "type": "object",
            "properties": {
                "nested": {"type": "object", "properties": {"x": {"type": "string"}}}
            }
        });
        let options = GenerationOptions::with_schema(open);
        let body = client().build_request_body("hello", &options);
        let schema = &body["text"]["format"]["schema"];
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["properties"]["nested"]["additionalProperties"], false);
    }

    #[test]
    fn test_reasoning_effort_wire_values() {
        assert_eq!(ReasoningEffort::Minimal.as_wire_str(), "minimal");
        assert_eq!(ReasoningEffort::Standard.as_wire_str(), "medium");
        assert_eq!(ReasoningEffort::High.as_wire_str(), "high");
    }

    #[test]
    fn test_extract_output_text_flattened() {
        let response = json!({"output_text": "hello there"});
        assert_eq!(
            GenerationClient::extract_output_text(&response),
            Some("hello there".to_string())
        );
    }

    #[test]
    fn test_extract_output_text_walks_output_items() {
        let response = json!({
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "content": [{"type": "output_text", "text": "from items"}]}
            ]
        });
        assert_eq!(
            GenerationClient::extract_output_text(&response),
            Some("from items".to_string())
        );
    }

    #[test]
    fn test_extract_output_text_missing() {
        let response = json!({"output": []});
        assert_eq!(GenerationClient::extract_output_text(&response), None);
    }

    #[test]
    fn test_sanitize_embedding_input() {
        assert_eq!(sanitize_embedding_input("a\nb"), "a b");
        assert_eq!(sanitize_embedding_input(""), "this is blank");
        assert_eq!(sanitize_embedding_input("plain"), "plain");
    }
}
