//! Provider configuration.

use serde::{Deserialize, Serialize};

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gpt-5-nano-2025-08-07";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Dimensionality of the vectors returned by the reference embedding model.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 120.0;

/// Default pause inserted before generation requests, in milliseconds.
pub const DEFAULT_REQUEST_PAUSE_MS: u64 = 100;

/// Connection and model configuration for the generation service.
///
/// Constructed once by the process entry point and passed by reference into
/// the provider adapter. The core holds no process-wide client state;
/// credential loading is the entry point's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Generation model identifier.
    pub model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// API key. `None` is accepted at construction time; requests without a
    /// key fail as adapter errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds, enforced by the HTTP transport.
    pub timeout_secs: f64,
    /// Fixed pause inserted before each generation request as crude rate
    /// limiting. Zero disables it.
    pub request_pause_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            request_pause_ms: DEFAULT_REQUEST_PAUSE_MS,
        }
    }
}

impl ProviderConfig {
    /// Create a configuration for the given model with defaults elsewhere.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    ///
    /// This is an explicit constructor for entry points that keep their
    /// credentials in the environment; nothing in the core reads the
    /// environment on its own.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
            ..Self::default()
        }
    }

    /// The API base URL, falling back to the public endpoint.
    pub fn api_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
    }
}
