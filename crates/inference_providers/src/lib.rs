//! Upstream chat providers and stream normalization
//!
//! This crate turns a provider-specific streaming response into a single
//! canonical stream of [`StreamEvent`]s.
//!
//! # Layers
//!
//! - [`external`]: one [`ProviderBackend`] per wire protocol. Backends issue
//!   the HTTP request and decode provider framing into [`RawFrame`]s.
//! - [`normalizer`]: [`UpstreamSession`] owns one in-flight request and drives
//!   it through `Open -> Streaming -> Terminal`, ending with exactly one
//!   `Error` or `Done` event.
//! - [`reasoning`]: [`ReasoningExtractor`] splits `<thinking>` tagged text out
//!   of the text deltas for reasoning-capable models.
//!
//! # Usage
//!
//! ```rust,ignore
//! use inference_providers::{
//!     BackendConfig, ChatCompletionParams, ChatMessage, OpenRouterBackend, StreamEvent,
//!     UpstreamSession,
//! };
//! use futures_util::StreamExt;
//! use std::sync::Arc;
//!
//! let params = ChatCompletionParams::new("openai/gpt-4o", vec![ChatMessage::user("Hi")]);
//! let mut events = UpstreamSession::open(
//!     Arc::new(OpenRouterBackend::new()),
//!     config,
//!     "openai/gpt-4o".to_string(),
//!     params,
//! );
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         StreamEvent::TextDelta(text) => print!("{text}"),
//!         StreamEvent::ReasoningDelta(_) => {}
//!         StreamEvent::Error { message, .. } => eprintln!("Stream error: {message}"),
//!         StreamEvent::Done => break,
//!     }
//! }
//! ```

pub mod external;
pub mod mock;
pub mod models;
pub mod normalizer;
pub mod reasoning;
pub mod sse_parser;

use std::pin::Pin;

use futures_core::Stream;

// Re-export commonly used types for convenience
pub use external::{
    BackendConfig, GeminiBackend, OpenAiCompatibleBackend, OpenRouterBackend, ProviderBackend,
    EXTRA_APP_TITLE, EXTRA_HTTP_REFERER,
};
pub use mock::{MockBackend, RequestMatcher, ResponseTemplate};
pub use models::{
    ChatCompletionParams, ChatMessage, CompletionError, MessageRole, RawFrame, StreamErrorKind,
    StreamEvent,
};
pub use normalizer::{CancelHandle, UpstreamSession};
pub use reasoning::{ReasoningExtractor, TagScanner, DEFAULT_REASONING_TAG};

/// Raw frames decoded from one upstream response
///
/// An `Err` item ends the stream; nothing follows it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<RawFrame, CompletionError>> + Send>>;

/// Normalized events handed to the caller
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Upper bound on how much of an upstream error body is echoed back
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Pull a human-readable message out of an upstream error body.
///
/// Understands the common `{"error": {"message": ...}}` and
/// `{"error": "..."}` shapes; anything else is returned truncated.
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = value.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .or_else(|| error.and_then(|e| e.as_str()))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{truncated}...")
    } else {
        trimmed.to_string()
    }
}
