#![allow(dead_code)]

use api::{build_app, init_app_state_with_registry};
use config::{ApiConfig, ProvidersConfig, SecretString};
use inference_providers::{MockBackend, ProviderBackend, ResponseTemplate, StreamEvent};
use services::{model_router::ProviderTag, ProviderRegistry};
use std::sync::Arc;

pub const TEST_USER_ID: &str = "user-1";

/// Configuration with a gateway key and no default provider keys
pub fn test_config() -> ApiConfig {
    ApiConfig {
        logging: config::LoggingConfig {
            level: "debug".to_string(),
            format: "compact".to_string(),
            modules: std::collections::HashMap::new(),
        },
        providers: ProvidersConfig {
            gateway: config::GatewayConfig {
                api_key: Some(SecretString::new("gw-test-key")),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Test server whose every provider is served by one scripted backend
pub fn setup_test_server_with_config(
    config: ApiConfig,
    response: ResponseTemplate,
) -> (axum_test::TestServer, Arc<MockBackend>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .try_init();

    let mock = Arc::new(MockBackend::with_default_response(response));
    let mut registry = ProviderRegistry::from_config(&config.providers);
    for tag in [ProviderTag::Gateway, ProviderTag::GoogleApi, ProviderTag::OpenRouter] {
        registry = registry.with_override(tag, mock.clone() as Arc<dyn ProviderBackend>);
    }

    let app = build_app(init_app_state_with_registry(&config, registry));
    (axum_test::TestServer::new(app).unwrap(), mock)
}

pub fn setup_test_server(response: ResponseTemplate) -> (axum_test::TestServer, Arc<MockBackend>) {
    setup_test_server_with_config(test_config(), response)
}

pub fn chat_request(model: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            { "role": "user", "content": "Hello" }
        ]
    })
}

/// Decode the `data:` lines of an SSE body into canonical events
pub fn parse_sse_events(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).expect("event should be valid JSON"))
        .collect()
}
