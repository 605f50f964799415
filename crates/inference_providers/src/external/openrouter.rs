//! OpenRouter backend
//!
//! OpenRouter speaks the OpenAI chat completions wire format, so streaming is
//! delegated to [`OpenAiCompatibleBackend`]. On top of that it requires a key
//! and sends the `HTTP-Referer` / `X-Title` attribution headers.

use super::backend::{BackendConfig, ProviderBackend, EXTRA_APP_TITLE, EXTRA_HTTP_REFERER};
use super::openai_compatible::OpenAiCompatibleBackend;
use crate::{ChatCompletionParams, CompletionError, FrameStream};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Provider tag reported in credential errors
const PROVIDER_TAG: &str = "openrouter";

pub struct OpenRouterBackend {
    inner: OpenAiCompatibleBackend,
}

impl OpenRouterBackend {
    pub fn new() -> Self {
        Self {
            inner: OpenAiCompatibleBackend::new("openrouter"),
        }
    }

    fn build_headers(config: &BackendConfig) -> Result<HeaderMap, CompletionError> {
        let mut headers = OpenAiCompatibleBackend::build_headers(config)?;

        for (extra_key, header) in [(EXTRA_HTTP_REFERER, "http-referer"), (EXTRA_APP_TITLE, "x-title")]
        {
            let Some(value) = config.extra.get(extra_key).filter(|v| !v.is_empty()) else {
                continue;
            };
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(header), value);
                }
                Err(_) => {
                    tracing::warn!(header, "Skipping attribution header with invalid value");
                }
            }
        }

        Ok(headers)
    }
}

impl Default for OpenRouterBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for OpenRouterBackend {
    fn backend_type(&self) -> &'static str {
        "openrouter"
    }

    async fn chat_completion_stream(
        &self,
        config: &BackendConfig,
        model: &str,
        params: ChatCompletionParams,
    ) -> Result<FrameStream, CompletionError> {
        if !config.has_api_key() {
            return Err(CompletionError::MissingCredential {
                provider: PROVIDER_TAG.to_string(),
            });
        }

        let headers = Self::build_headers(config)?;
        self.inner.open_stream(config, model, params, headers).await
    }
}
