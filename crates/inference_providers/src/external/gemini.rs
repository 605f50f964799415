//! Direct Google Generative Language API backend
//!
//! Streams from `{base_url}/models/{model}:streamGenerateContent?alt=sse`.
//! Every `data:` line is a complete `GenerateContentResponse`; there is no
//! end-of-stream sentinel, the connection simply closes.

use super::backend::{BackendConfig, ProviderBackend};
use super::{http_client, post_streaming};
use crate::{
    sse_parser::{BufferedSSEParser, SSEEventParser},
    ChatCompletionParams, ChatMessage, CompletionError, FrameStream, MessageRole, RawFrame,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};

/// Provider tag reported in credential errors
const PROVIDER_TAG: &str = "google-api";

pub struct GeminiBackend {
    client: Client,
}

impl GeminiBackend {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    /// Convert chat messages to Gemini format
    fn convert_messages(
        messages: &[ChatMessage],
    ) -> (Option<GeminiSystemInstruction>, Vec<GeminiContent>) {
        let mut system_instruction = None;
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    // Gemini accepts a single systemInstruction; the last one wins
                    system_instruction = Some(GeminiSystemInstruction {
                        parts: vec![GeminiPart::text(&msg.content)],
                    });
                }
                MessageRole::User => contents.push(GeminiContent {
                    role: "user".to_string(),
                    parts: vec![GeminiPart::text(&msg.content)],
                }),
                MessageRole::Assistant => contents.push(GeminiContent {
                    role: "model".to_string(),
                    parts: vec![GeminiPart::text(&msg.content)],
                }),
            }
        }

        (system_instruction, contents)
    }

    fn build_request(params: ChatCompletionParams) -> GeminiRequest {
        let (system_instruction, contents) = Self::convert_messages(&params.messages);

        let generation_config = if params.temperature.is_some()
            || params.top_p.is_some()
            || params.max_tokens.is_some()
            || params.stop.is_some()
        {
            Some(GeminiGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                max_output_tokens: params.max_tokens,
                stop_sequences: params.stop,
            })
        } else {
            None
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

impl Default for GeminiBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip vendor prefix from model name (e.g., "google/gemini-1.5-pro" -> "gemini-1.5-pro")
///
/// The Gemini API expects bare model names in the URL path.
fn strip_vendor_prefix(model: &str) -> &str {
    model
        .strip_prefix("google/")
        .or_else(|| model.strip_prefix("vertex/"))
        .unwrap_or(model)
}

/// Build the streaming endpoint for `model`.
///
/// The model name becomes a single path segment, so anything that would
/// change the URL structure is rejected.
fn stream_url(base_url: &str, model: &str) -> Result<String, CompletionError> {
    let name = strip_vendor_prefix(model);
    let invalid =
        |c: char| matches!(c, '/' | '?' | '#' | '%' | '\\') || c.is_whitespace() || c.is_control();
    if name.is_empty() || name.contains(invalid) {
        return Err(CompletionError::InvalidModel(model.to_string()));
    }

    Ok(format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        base_url.trim_end_matches('/'),
        name
    ))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    /// Set on thought-summary parts when thinking output is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(content: &str) -> Self {
        Self {
            text: Some(content.to_string()),
            thought: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

/// Gemini event parser
///
/// Joins the text parts of the first candidate into a single frame; parts
/// flagged `thought` become a separate reasoning frame emitted first.
pub struct GeminiEventParser;

impl SSEEventParser for GeminiEventParser {
    type State = ();

    fn parse_event(_state: &mut (), data: &str) -> Result<Vec<RawFrame>, CompletionError> {
        // Don't include parse error details - may contain customer data
        let response: GeminiResponse = match serde_json::from_str(data) {
            Ok(response) => response,
            Err(_) => {
                tracing::debug!("Skipping unparseable Gemini stream payload");
                return Ok(Vec::new());
            }
        };

        if response.candidates.is_empty() {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(CompletionError::ProtocolError(format!(
                    "Prompt blocked by provider: {reason}"
                )));
            }
            return Ok(Vec::new());
        }

        let Some(content) = response.candidates.into_iter().next().and_then(|c| c.content) else {
            return Ok(Vec::new());
        };

        let mut text = String::new();
        let mut thought = String::new();
        for part in content.parts {
            let Some(part_text) = part.text else {
                continue;
            };
            if part.thought.unwrap_or(false) {
                thought.push_str(&part_text);
            } else {
                text.push_str(&part_text);
            }
        }

        let mut frames = Vec::with_capacity(2);
        if !thought.is_empty() {
            frames.push(RawFrame::Reasoning(thought));
        }
        if !text.is_empty() {
            frames.push(RawFrame::Text(text));
        }
        Ok(frames)
    }
}

pub type GeminiSSEParser<S> = BufferedSSEParser<S, GeminiEventParser>;

/// Create a new Gemini SSE parser
pub fn new_gemini_sse_parser<S, E>(stream: S) -> GeminiSSEParser<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    BufferedSSEParser::new(stream, ())
}

#[async_trait]
impl ProviderBackend for GeminiBackend {
    fn backend_type(&self) -> &'static str {
        "google"
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

        let url = stream_url(&config.base_url, model)?;
        let request = Self::build_request(params);

        // API key is passed via x-goog-api-key header, never in the URL
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(config.api_key.trim()).map_err(|_| {
                CompletionError::ProtocolError(
                    "API key contains characters not allowed in a header".to_string(),
                )
            })?,
        );

        tracing::debug!(
            model = %strip_vendor_prefix(model),
            contents = request.contents.len(),
            "Opening Gemini stream"
        );

        let response =
            post_streaming(&self.client, &url, headers, config.timeout(), &request).await?;

        Ok(Box::pin(new_gemini_sse_parser(response.bytes_stream())))
    }
}
