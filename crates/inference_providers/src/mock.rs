//! Mock implementation of ProviderBackend for testing
//!
//! This module provides a scripted backend that produces realistic frame
//! streams without any network access. It also records what it was asked
//! for and how far its streams were read, so routing, cancellation and
//! backpressure can be asserted on.

use crate::external::{BackendConfig, ProviderBackend};
use crate::{ChatCompletionParams, ChatMessage, CompletionError, FrameStream, RawFrame};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Request matcher for conditional responses
#[derive(Clone, Debug)]
pub enum RequestMatcher {
    /// Match any request
    Any,
    /// Match requests whose message contents, joined by spaces, equal the text
    ExactPrompt(String),
    /// Match requests for an exact upstream model name
    Model(String),
}

impl RequestMatcher {
    /// Check if this matcher matches the given request
    pub fn matches(&self, model: &str, params: &ChatCompletionParams) -> bool {
        match self {
            Self::Any => true,
            Self::ExactPrompt(prompt) => Self::extract_text_from_messages(&params.messages) == *prompt,
            Self::Model(expected) => expected == model,
        }
    }

    /// Extract all text content from messages
    fn extract_text_from_messages(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|msg| msg.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Template for generating responses
#[derive(Clone, Debug)]
pub struct ResponseTemplate {
    content: String,
    /// Explicit text chunks; overrides word-by-word splitting of `content`
    chunks: Option<Vec<String>>,
    reasoning_content: Option<String>,
    /// Simulate an upstream connection reset after N frames
    disconnect_after_chunks: Option<usize>,
}

impl ResponseTemplate {
    /// Create a new response template with the given content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            chunks: None,
            reasoning_content: None,
            disconnect_after_chunks: None,
        }
    }

    /// Stream exactly these text chunks, in order
    pub fn from_chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        Self {
            content: chunks.concat(),
            chunks: Some(chunks),
            reasoning_content: None,
            disconnect_after_chunks: None,
        }
    }

    /// Set upstream-marked reasoning content for this template
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning_content = Some(reasoning.into());
        self
    }

    /// Simulate a dropped upstream connection after N frames
    /// The stream yields a connection error instead of finishing cleanly
    pub fn with_disconnect_after(mut self, chunks: usize) -> Self {
        self.disconnect_after_chunks = Some(chunks);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Split text word by word (split by spaces), keeping the separating space
    fn words(text: &str) -> Vec<String> {
        text.split(' ')
            .enumerate()
            .map(|(i, word)| {
                if i == 0 {
                    word.to_string()
                } else {
                    format!(" {word}")
                }
            })
            .filter(|word| !word.is_empty())
            .collect()
    }

    /// Generate the frame sequence for this template
    /// Reasoning (if any) streams first, then the content
    fn generate_frames(&self) -> Vec<Result<RawFrame, CompletionError>> {
        let mut frames: Vec<Result<RawFrame, CompletionError>> = Vec::new();

        if let Some(reasoning) = &self.reasoning_content {
            frames.extend(
                Self::words(reasoning)
                    .into_iter()
                    .map(|w| Ok(RawFrame::Reasoning(w))),
            );
        }

        let text_chunks = match &self.chunks {
            Some(chunks) => chunks.clone(),
            None => Self::words(&self.content),
        };
        frames.extend(text_chunks.into_iter().map(|c| Ok(RawFrame::Text(c))));

        if let Some(limit) = self.disconnect_after_chunks {
            frames.truncate(limit);
            frames.push(Err(CompletionError::ConnectionError(
                "connection reset by peer".to_string(),
            )));
        }

        frames
    }
}

/// What the backend was last asked to do
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub extra: HashMap<String, String>,
    pub messages: Vec<ChatMessage>,
}

/// Configuration for a single expectation
struct MockExpectation {
    matcher: RequestMatcher,
    response: ResponseTemplate,
}

/// Configuration for the mock backend
struct MockConfig {
    expectations: Vec<MockExpectation>,
    default_response: ResponseTemplate,
    open_error: Option<CompletionError>,
    hold_open: bool,
}

/// Builder for configuring a single expectation
pub struct MockExpectationBuilder {
    config: Arc<Mutex<MockConfig>>,
    matcher: RequestMatcher,
}

impl MockExpectationBuilder {
    /// Set the response for this expectation
    pub async fn respond_with(self, response: ResponseTemplate) {
        let mut config = self.config.lock().await;
        config.expectations.push(MockExpectation {
            matcher: self.matcher,
            response,
        });
    }
}

/// Decrements the open-stream count when the stream holding it is dropped
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock backend that implements ProviderBackend for testing
pub struct MockBackend {
    /// Configuration for conditional responses (thread-safe)
    config: Arc<Mutex<MockConfig>>,
    last_request: Arc<Mutex<Option<RecordedRequest>>>,
    open_calls: Arc<AtomicUsize>,
    open_streams: Arc<AtomicUsize>,
    frames_served: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new mock backend with a default response
    pub fn new() -> Self {
        Self::with_default_response(ResponseTemplate::new("1. 2. 3."))
    }

    pub fn with_default_response(response: ResponseTemplate) -> Self {
        Self {
            config: Arc::new(Mutex::new(MockConfig {
                expectations: Vec::new(),
                default_response: response,
                open_error: None,
                hold_open: false,
            })),
            last_request: Arc::new(Mutex::new(None)),
            open_calls: Arc::new(AtomicUsize::new(0)),
            open_streams: Arc::new(AtomicUsize::new(0)),
            frames_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a conditional response for a specific matcher
    pub fn when(&self, matcher: RequestMatcher) -> MockExpectationBuilder {
        MockExpectationBuilder {
            config: self.config.clone(),
            matcher,
        }
    }

    /// Set the default response for requests that don't match any expectation
    pub async fn set_default_response(&self, response: ResponseTemplate) {
        let mut config = self.config.lock().await;
        config.default_response = response;
    }

    /// Fail every subsequent open with this error (e.g. a non-2xx status)
    pub async fn set_open_error(&self, error: CompletionError) {
        let mut config = self.config.lock().await;
        config.open_error = Some(error);
    }

    /// Keep streams open after their last frame instead of ending them
    pub async fn set_hold_open(&self, hold_open: bool) {
        let mut config = self.config.lock().await;
        config.hold_open = hold_open;
    }

    /// Number of times a stream was requested
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet dropped
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Frames actually pulled by consumers across all streams
    pub fn frames_served(&self) -> usize {
        self.frames_served.load(Ordering::SeqCst)
    }

    pub async fn last_request(&self) -> Option<RecordedRequest> {
        self.last_request.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for MockBackend {
    fn backend_type(&self) -> &'static str {
        "mock"
    }

    async fn chat_completion_stream(
        &self,
        config: &BackendConfig,
        model: &str,
        params: ChatCompletionParams,
    ) -> Result<FrameStream, CompletionError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some(RecordedRequest {
            model: model.to_string(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            extra: config.extra.clone(),
            messages: params.messages.clone(),
        });

        let (template, hold_open) = {
            let mock_config = self.config.lock().await;
            if let Some(error) = &mock_config.open_error {
                return Err(error.clone());
            }
            let template = mock_config
                .expectations
                .iter()
                .find(|e| e.matcher.matches(model, &params))
                .map(|e| e.response.clone())
                .unwrap_or_else(|| mock_config.default_response.clone());
            (template, mock_config.hold_open)
        };

        let frames = stream::iter(template.generate_frames());
        let tail = if hold_open {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard(self.open_streams.clone());
        let served = self.frames_served.clone();

        Ok(Box::pin(frames.chain(tail).map(move |frame| {
            let _connection = &guard;
            served.fetch_add(1, Ordering::SeqCst);
            frame
        })))
    }
}
