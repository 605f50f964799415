//! Backend trait for upstream provider implementations
//!
//! Each backend is the only place that knows a provider's request shape and
//! wire framing. Backends are stateless apart from their HTTP client and are
//! built once at startup; per-request state lives in the returned stream.

use crate::{ChatCompletionParams, CompletionError, FrameStream};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Extra key carrying the `HTTP-Referer` attribution header value
pub const EXTRA_HTTP_REFERER: &str = "http_referer";
/// Extra key carrying the `X-Title` attribution header value
pub const EXTRA_APP_TITLE: &str = "app_title";

/// Configuration for a single upstream call
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL for the provider API
    pub base_url: String,
    /// API key for authentication (may be empty for the gateway)
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: i64,
    /// Provider-specific extra configuration (e.g. attribution headers)
    pub extra: HashMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_seconds: 120,
            extra: HashMap::new(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("extra", &self.extra)
            .finish()
    }
}

impl BackendConfig {
    pub(crate) fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds.max(1) as u64)
    }

    pub(crate) fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Upstream protocol adapter
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Returns the backend type identifier (e.g., "gateway", "openrouter", "google")
    fn backend_type(&self) -> &'static str;

    /// Opens a streaming chat completion and returns the raw frame stream.
    ///
    /// The backend is responsible for:
    /// - Translating ChatCompletionParams to the provider's request format
    /// - Making the HTTP request and checking the response status
    /// - Decoding the provider's framing into [`RawFrame`](crate::RawFrame)s
    ///
    /// Dropping the returned stream closes the upstream connection.
    async fn chat_completion_stream(
        &self,
        config: &BackendConfig,
        model: &str,
        params: ChatCompletionParams,
    ) -> Result<FrameStream, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = BackendConfig {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: "sk-or-v1-secret".to_string(),
            ..Default::default()
        };

        let debug = format!("{:?}", config);
        assert!(debug.contains("openrouter.ai"));
        assert!(!debug.contains("sk-or-v1-secret"));
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = BackendConfig {
            api_key: "  ".to_string(),
            ..Default::default()
        };
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_timeout_is_at_least_one_second() {
        let config = BackendConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.timeout(), std::time::Duration::from_secs(1));
    }
}
