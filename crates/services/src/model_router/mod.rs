//! Model routing
//!
//! [`ModelRouter::stream`] is the single entry point: it resolves the model
//! identifier, picks a credential, selects the backend and hands back a
//! normalized event stream. Everything that can be decided without touching
//! the network fails fast here; everything after is reported in-stream.

pub mod identifier;
pub mod registry;

pub use identifier::{resolve, ProviderTag, ResolvedModel};
pub use registry::{ProviderBinding, ProviderRegistry};

use crate::credentials::{CredentialResolver, CredentialSource};
use futures::Stream;
use inference_providers::{
    CancelHandle, ChatCompletionParams, ChatMessage, CompletionError, EventStream,
    ReasoningExtractor, StreamEvent, UpstreamSession,
};
use std::pin::Pin;
use std::task::{Context, Poll};

/// One chat streaming request as received from the caller
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub model: String,
    /// Caller whose stored credentials take precedence, if any
    pub user_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i64>,
}

impl RouteRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            user_id: None,
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Normalized events for one routed request
///
/// Dropping it, or calling [`CancelHandle::cancel`] on its handle, releases
/// the upstream connection.
pub struct RoutedStream {
    resolved: ResolvedModel,
    credential_source: CredentialSource,
    cancel: CancelHandle,
    events: EventStream,
}

impl RoutedStream {
    pub fn resolved(&self) -> &ResolvedModel {
        &self.resolved
    }

    pub fn credential_source(&self) -> CredentialSource {
        self.credential_source
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Stream for RoutedStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        self.events.as_mut().poll_next(cx)
    }
}

pub struct ModelRouter {
    registry: ProviderRegistry,
    credentials: CredentialResolver,
}

impl ModelRouter {
    pub fn new(registry: ProviderRegistry, credentials: CredentialResolver) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    /// Route a request and return its event stream.
    ///
    /// Fails fast with `InvalidModel`, `UnsupportedProvider` or
    /// `MissingCredential`; no upstream request has been made in that case.
    /// The upstream request itself is issued on the first poll.
    pub async fn stream(&self, request: RouteRequest) -> Result<RoutedStream, CompletionError> {
        let resolved = resolve(&request.model);
        if resolved.upstream_model.trim().is_empty() {
            return Err(CompletionError::InvalidModel(request.model));
        }

        let binding = self
            .registry
            .get(resolved.provider)
            .ok_or_else(|| CompletionError::UnsupportedProvider(resolved.provider.to_string()))?;

        let credential = self
            .credentials
            .resolve(request.user_id.as_deref(), resolved.provider)
            .await?;
        let config = self.registry.backend_config(binding, &credential);

        let mut params = ChatCompletionParams::new(resolved.upstream_model.clone(), request.messages);
        params.temperature = request.temperature;
        params.max_tokens = request.max_tokens;

        tracing::info!(
            provider = %resolved.provider,
            model = %resolved.upstream_model,
            reasoning = resolved.is_reasoning,
            credential_source = %credential.source,
            "Routing chat stream"
        );

        let session = UpstreamSession::open(
            binding.backend.clone(),
            config,
            resolved.upstream_model.clone(),
            params,
        );
        let cancel = session.cancel_handle();
        let events: EventStream = if resolved.is_reasoning {
            Box::pin(ReasoningExtractor::with_default_tag(session))
        } else {
            Box::pin(session)
        };

        Ok(RoutedStream {
            resolved,
            credential_source: credential.source,
            cancel,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStore, InMemoryCredentialStore, ProviderCredential};
    use config::{OpenRouterConfig, ProvidersConfig, SecretString};
    use futures::StreamExt;
    use inference_providers::{MockBackend, ProviderBackend, ResponseTemplate, StreamErrorKind};
    use std::sync::Arc;

    struct Harness {
        router: ModelRouter,
        backend: Arc<MockBackend>,
        store: Arc<InMemoryCredentialStore>,
    }

    fn harness(providers: ProvidersConfig, response: ResponseTemplate) -> Harness {
        let backend = Arc::new(MockBackend::with_default_response(response));
        let store = Arc::new(InMemoryCredentialStore::new());

        let mut registry = ProviderRegistry::from_config(&providers);
        for tag in [ProviderTag::Gateway, ProviderTag::GoogleApi, ProviderTag::OpenRouter] {
            registry = registry.with_override(tag, backend.clone() as Arc<dyn ProviderBackend>);
        }
        let credentials =
            CredentialResolver::new(store.clone() as Arc<dyn CredentialStore>, &providers);

        Harness {
            router: ModelRouter::new(registry, credentials),
            backend,
            store,
        }
    }

    fn request(model: &str) -> RouteRequest {
        RouteRequest::new(model, vec![ChatMessage::user("Hi")])
    }

    #[tokio::test]
    async fn test_missing_credential_fails_fast_without_upstream_call() {
        let h = harness(ProvidersConfig::default(), ResponseTemplate::new("unused"));

        let result = h.router.stream(request("openrouter/openai/gpt-4o")).await;

        assert!(matches!(
            result,
            Err(CompletionError::MissingCredential { ref provider }) if provider == "openrouter"
        ));
        assert_eq!(h.backend.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_model_is_invalid() {
        let h = harness(ProvidersConfig::default(), ResponseTemplate::new("unused"));

        for model in ["", "openrouter/", "modelhub/", "google-api/  "] {
            let result = h.router.stream(request(model)).await;
            assert!(
                matches!(result, Err(CompletionError::InvalidModel(_))),
                "{model:?} should be rejected"
            );
        }
        assert_eq!(h.backend.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_modelhub_routes_to_gateway_namespace() {
        let h = harness(ProvidersConfig::default(), ResponseTemplate::new("hello"));

        let stream = h.router.stream(request("modelhub/acme/chat-7b")).await.unwrap();
        assert_eq!(stream.resolved().provider, ProviderTag::ModelHub);
        let events: Vec<_> = stream.collect().await;

        assert_eq!(
            events,
            vec![StreamEvent::TextDelta("hello".to_string()), StreamEvent::Done]
        );
        let recorded = h.backend.last_request().await.unwrap();
        assert_eq!(recorded.model, "huggingface/acme/chat-7b");
        assert_eq!(recorded.base_url, config::DEFAULT_GATEWAY_BASE_URL);
    }

    #[tokio::test]
    async fn test_user_key_and_attribution_reach_backend() {
        let providers = ProvidersConfig {
            openrouter: OpenRouterConfig {
                default_api_key: Some(SecretString::new("sk-or-env")),
                ..Default::default()
            },
            ..Default::default()
        };
        let h = harness(providers, ResponseTemplate::new("ok"));
        h.store
            .upsert(ProviderCredential::new("u1", ProviderTag::OpenRouter, "sk-or-user"))
            .await
            .unwrap();

        let stream = h
            .router
            .stream(request("openrouter/anthropic/claude-3-haiku").for_user("u1"))
            .await
            .unwrap();
        assert_eq!(stream.credential_source(), CredentialSource::User);
        let _: Vec<_> = stream.collect().await;

        let recorded = h.backend.last_request().await.unwrap();
        assert_eq!(recorded.model, "anthropic/claude-3-haiku");
        assert_eq!(recorded.api_key, "sk-or-user");
        assert_eq!(
            recorded.extra.get(inference_providers::EXTRA_HTTP_REFERER).unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_reasoning_model_splits_thinking_tags() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::from_chunks(["<thinking>ab", "cd</thinking>ef"]),
        );

        let stream = h
            .router
            .stream(request("anthropic/claude-3.7-sonnet-thinking"))
            .await
            .unwrap();
        assert!(stream.resolved().is_reasoning);
        let events: Vec<_> = stream.collect().await;

        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningDelta("ab".to_string()),
                StreamEvent::ReasoningDelta("cd".to_string()),
                StreamEvent::TextDelta("ef".to_string()),
                StreamEvent::Done,
            ]
        );
        let recorded = h.backend.last_request().await.unwrap();
        assert_eq!(recorded.model, "anthropic/claude-3.7-sonnet");
    }

    #[tokio::test]
    async fn test_non_reasoning_model_keeps_tags_as_text() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::from_chunks(["<thinking>x</thinking>"]),
        );

        let events: Vec<_> = h
            .router
            .stream(request("openai/gpt-4o"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            events[0],
            StreamEvent::TextDelta("<thinking>x</thinking>".to_string())
        );
    }

    #[tokio::test]
    async fn test_upstream_rejection_is_in_stream_error() {
        let h = harness(ProvidersConfig::default(), ResponseTemplate::new("unused"));
        h.backend
            .set_open_error(CompletionError::HttpError {
                status_code: 429,
                message: "rate limited".to_string(),
            })
            .await;

        let events: Vec<_> = h
            .router
            .stream(request("openai/gpt-4o"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            StreamEvent::Error {
                kind: StreamErrorKind::UpstreamHttp { status: 429 },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_upstream_and_emits_nothing_more() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::new("one two three"),
        );
        h.backend.set_hold_open(true).await;

        let mut stream = h.router.stream(request("openai/gpt-4o")).await.unwrap();
        let handle = stream.cancel_handle();

        assert_eq!(stream.next().await, Some(StreamEvent::TextDelta("one".to_string())));
        assert_eq!(h.backend.open_streams(), 1);

        handle.cancel();
        assert_eq!(stream.next().await, None);
        assert_eq!(h.backend.open_streams(), 0);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_cancel_releases_upstream_before_next_poll() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::new("one two three"),
        );
        h.backend.set_hold_open(true).await;

        let mut stream = h.router.stream(request("openai/gpt-4o")).await.unwrap();
        let handle = stream.cancel_handle();
        assert!(stream.next().await.is_some());
        assert_eq!(h.backend.open_streams(), 1);

        handle.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(h.backend.open_streams(), 0);

        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_upstream() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::new("one two three"),
        );
        h.backend.set_hold_open(true).await;

        let mut stream = h.router.stream(request("openai/gpt-4o")).await.unwrap();
        assert!(stream.next().await.is_some());
        assert_eq!(h.backend.open_streams(), 1);

        drop(stream);
        assert_eq!(h.backend.open_streams(), 0);
    }

    #[tokio::test]
    async fn test_backpressure_reads_only_what_is_consumed() {
        let h = harness(
            ProvidersConfig::default(),
            ResponseTemplate::new("a b c d e f g h"),
        );

        let mut stream = h.router.stream(request("openai/gpt-4o")).await.unwrap();
        assert_eq!(h.backend.open_calls(), 0);

        stream.next().await;
        stream.next().await;
        assert_eq!(h.backend.open_calls(), 1);
        assert_eq!(h.backend.frames_served(), 2);
    }

    #[tokio::test]
    async fn test_google_default_key_is_used_for_anonymous_caller() {
        let providers = ProvidersConfig {
            google: config::GoogleConfig {
                default_api_key: Some(SecretString::new("AIza-env")),
                ..Default::default()
            },
            ..Default::default()
        };
        let h = harness(providers, ResponseTemplate::new("hi"));

        let stream = h
            .router
            .stream(request("google-api/gemini-1.5-flash"))
            .await
            .unwrap();
        assert_eq!(stream.credential_source(), CredentialSource::Environment);
        let _: Vec<_> = stream.collect().await;

        let recorded = h.backend.last_request().await.unwrap();
        assert_eq!(recorded.model, "gemini-1.5-flash");
        assert_eq!(recorded.api_key, "AIza-env");
        assert_eq!(recorded.base_url, config::DEFAULT_GOOGLE_BASE_URL);
    }
}
