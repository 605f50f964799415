//! OpenAI-compatible streaming backend
//!
//! Used directly as the gateway passthrough (the default multi-model backend)
//! and wrapped by the OpenRouter backend, which speaks the same wire format.
//!
//! Wire format: `POST {base_url}/chat/completions` with `stream: true`; the
//! response is SSE where each `data:` line carries a chat completion chunk
//! and `data: [DONE]` ends the stream.

use super::backend::{BackendConfig, ProviderBackend};
use super::{http_client, post_streaming};
use crate::{
    sse_parser::{BufferedSSEParser, SSEEventParser},
    ChatCompletionParams, CompletionError, FrameStream, RawFrame,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: Option<OpenAiDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    /// OpenRouter's name for reasoning tokens
    #[serde(default)]
    reasoning: Option<String>,
    /// DeepSeek / vLLM name for reasoning tokens
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Event parser for OpenAI-style chat completion chunks
pub struct OpenAiEventParser;

impl SSEEventParser for OpenAiEventParser {
    type State = ();

    fn parse_event(_state: &mut (), data: &str) -> Result<Vec<RawFrame>, CompletionError> {
        let value: serde_json::Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(_) => {
                // Providers interleave keep-alive noise; don't log the payload itself
                tracing::debug!("Skipping non-JSON SSE payload");
                return Ok(Vec::new());
            }
        };

        // Mid-stream failures arrive as a chunk with a top-level error object
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("upstream reported an error")
                .to_string();
            return Err(CompletionError::ProtocolError(message));
        }

        let chunk: OpenAiStreamChunk = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(_) => {
                tracing::debug!("Skipping SSE payload that is not a chat completion chunk");
                return Ok(Vec::new());
            }
        };

        let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
            return Ok(Vec::new());
        };

        let mut frames = Vec::with_capacity(2);
        if let Some(reasoning) = delta
            .reasoning
            .filter(|r| !r.is_empty())
            .or(delta.reasoning_content.filter(|r| !r.is_empty()))
        {
            frames.push(RawFrame::Reasoning(reasoning));
        }
        if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
            frames.push(RawFrame::Text(content));
        }
        Ok(frames)
    }
}

pub type OpenAiSSEParser<S> = BufferedSSEParser<S, OpenAiEventParser>;

/// Create a new OpenAI-style SSE parser over a byte stream
pub fn new_openai_sse_parser<S, E>(stream: S) -> OpenAiSSEParser<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    BufferedSSEParser::new(stream, ())
}

/// OpenAI-compatible backend
///
/// Pure passthrough: the request is forwarded as-is with the resolved model
/// name and `stream: true`.
pub struct OpenAiCompatibleBackend {
    client: Client,
    backend_type: &'static str,
}

impl OpenAiCompatibleBackend {
    pub fn new(backend_type: &'static str) -> Self {
        Self {
            client: http_client(),
            backend_type,
        }
    }

    /// The default catch-all gateway backend
    pub fn gateway() -> Self {
        Self::new("gateway")
    }

    /// Content type plus bearer auth when a key is configured
    pub(crate) fn build_headers(config: &BackendConfig) -> Result<HeaderMap, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if config.has_api_key() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
                .map_err(|_| {
                    CompletionError::ProtocolError(
                        "API key contains characters not allowed in a header".to_string(),
                    )
                })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Issue the streaming request with the given headers and decode the SSE response
    pub(crate) async fn open_stream(
        &self,
        config: &BackendConfig,
        model: &str,
        params: ChatCompletionParams,
        headers: HeaderMap,
    ) -> Result<FrameStream, CompletionError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let mut streaming_params = params;
        streaming_params.model = model.to_string();
        streaming_params.stream = Some(true);

        tracing::debug!(
            backend = self.backend_type,
            model = %model,
            messages = streaming_params.messages.len(),
            "Opening OpenAI-compatible stream"
        );

        let response = post_streaming(
            &self.client,
            &url,
            headers,
            config.timeout(),
            &streaming_params,
        )
        .await?;

        Ok(Box::pin(new_openai_sse_parser(response.bytes_stream())))
    }
}

#[async_trait]
impl ProviderBackend for OpenAiCompatibleBackend {
    fn backend_type(&self) -> &'static str {
        self.backend_type
    }

    async fn chat_completion_stream(
        &self,
        config: &BackendConfig,
        model: &str,
        params: ChatCompletionParams,
    ) -> Result<FrameStream, CompletionError> {
        let headers = Self::build_headers(config)?;
        self.open_stream(config, model, params, headers).await
    }
}
