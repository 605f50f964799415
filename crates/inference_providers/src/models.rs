use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Parameters for a streamed chat completion (OpenAI request shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionParams {
    /// Upstream model name; adapters overwrite it with the resolved name
    pub model: String,

    /// List of messages comprising the conversation so far
    pub messages: Vec<ChatMessage>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,

    /// Sampling temperature between 0 and 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter (0-1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Whether to stream back partial progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatCompletionParams {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            stream: None,
        }
    }
}

/// A provider-native unit of output, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Text(String),
    /// Content the upstream already marked as reasoning-only
    Reasoning(String),
}

/// Classification carried by a terminal [`StreamEvent::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    UpstreamHttp { status: u16 },
    UpstreamProtocol,
    Connection,
}

/// Canonical, protocol-independent stream event.
///
/// `Error` and `Done` are terminal: a stream yields exactly one of them last,
/// unless the caller cancels, in which case it yields neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta(String),
    ReasoningDelta(String),
    Error {
        kind: StreamErrorKind,
        message: String,
    },
    Done,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error { .. } | StreamEvent::Done)
    }
}

impl From<RawFrame> for StreamEvent {
    fn from(frame: RawFrame) -> Self {
        match frame {
            RawFrame::Text(text) => StreamEvent::TextDelta(text),
            RawFrame::Reasoning(text) => StreamEvent::ReasoningDelta(text),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Reserved: identifier resolution currently falls back to the gateway
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("No API key configured for provider '{provider}'. Configure one in settings or set the provider's default key.")]
    MissingCredential { provider: String },
    #[error("Invalid model identifier: {0}")]
    InvalidModel(String),
    #[error("Upstream returned HTTP {status_code}: {message}")]
    HttpError { status_code: u16, message: String },
    #[error("Upstream protocol error: {0}")]
    ProtocolError(String),
    #[error("Upstream connection error: {0}")]
    ConnectionError(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl CompletionError {
    /// Kind used when this error terminates an already-open stream
    pub fn stream_error_kind(&self) -> StreamErrorKind {
        match self {
            CompletionError::HttpError { status_code, .. } => StreamErrorKind::UpstreamHttp {
                status: *status_code,
            },
            CompletionError::ConnectionError(_) => StreamErrorKind::Connection,
            _ => StreamErrorKind::UpstreamProtocol,
        }
    }
}
