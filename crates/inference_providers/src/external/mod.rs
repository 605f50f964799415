//! Upstream provider backends
//!
//! Each backend implements [`ProviderBackend`] for one wire protocol and turns
//! the provider's response into a stream of [`RawFrame`](crate::RawFrame)s.
//!
//! # Architecture
//!
//! ```text
//! ProviderBackend
//!     ├── OpenAiCompatibleBackend (gateway passthrough, also used for modelhub)
//!     ├── OpenRouterBackend       (OpenAI wire format + attribution headers)
//!     └── GeminiBackend           (Google streamGenerateContent SSE)
//! ```
//!
//! # Adding New Providers
//!
//! 1. **If OpenAI-compatible**: construct an `OpenAiCompatibleBackend` with a
//!    new backend type and register it under a provider tag.
//! 2. **If different API format**: add a backend file implementing
//!    `ProviderBackend` with its own `SSEEventParser`.

pub mod backend;
pub mod gemini;
pub mod openai_compatible;
pub mod openrouter;

use crate::{extract_error_message, CompletionError};
use reqwest::{header::HeaderMap, Client, Response};
use serde::Serialize;
use std::time::Duration;

pub use backend::{BackendConfig, ProviderBackend, EXTRA_APP_TITLE, EXTRA_HTTP_REFERER};
pub use gemini::GeminiBackend;
pub use openai_compatible::OpenAiCompatibleBackend;
pub use openrouter::OpenRouterBackend;

/// Shared client settings for every backend
pub(crate) fn http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build tuned HTTP client, using defaults");
            Client::new()
        })
}

/// POST a JSON body and return the response once its status is known to be 2xx.
///
/// `timeout` bounds connecting and receiving response headers only; the body
/// of a long generation may keep streaming past it.
///
/// Non-success responses are read in full and turned into
/// [`CompletionError::HttpError`]; transport failures and timeouts become
/// [`CompletionError::ConnectionError`].
pub(crate) async fn post_streaming<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
    body: &B,
) -> Result<Response, CompletionError> {
    let request = client.post(url).headers(headers).json(body).send();

    let response = tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| {
            tracing::warn!(
                timeout_secs = timeout.as_secs_f64(),
                "Upstream did not respond in time"
            );
            CompletionError::ConnectionError(format!(
                "Upstream did not respond within {}s",
                timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| CompletionError::ConnectionError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|e| format!("Failed to read error response body: {e}"));

        tracing::warn!(status_code, "Upstream rejected streaming request");
        return Err(CompletionError::HttpError {
            status_code,
            message: extract_error_message(&error_text),
        });
    }

    Ok(response)
}
