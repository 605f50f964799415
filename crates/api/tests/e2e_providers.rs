// E2E tests for provider key settings and the model catalog
mod common;

use api::models::{CredentialListResponse, CredentialResponse, ErrorResponse, ModelInfo, ModelsResponse};
use common::*;
use inference_providers::ResponseTemplate;

#[tokio::test]
async fn test_settings_require_user_id() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    let response = server.get("/v1/providers").await;
    assert_eq!(response.status_code(), 401);
    assert_eq!(response.json::<ErrorResponse>().error.r#type, "unauthorized");
}

#[tokio::test]
async fn test_save_list_toggle_delete() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    let saved = server
        .post("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({
            "provider": "google-api",
            "api_key": "AIzaSyExampleKey123",
            "base_url": "https://proxy.example/v1beta"
        }))
        .await
        .json::<CredentialResponse>();
    assert_eq!(saved.provider, "google-api");
    assert_eq!(saved.masked_key, "AIzaSyEx...");
    assert!(saved.is_enabled);
    assert_eq!(saved.base_url.as_deref(), Some("https://proxy.example/v1beta"));

    let listed = server
        .get("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .await
        .json::<CredentialListResponse>();
    assert_eq!(listed.data.len(), 1);
    let body = serde_json::to_string(&listed).unwrap();
    assert!(!body.contains("AIzaSyExampleKey123"), "full key must never be returned");

    let toggled = server
        .patch("/v1/providers/google-api")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({"is_enabled": false}))
        .await
        .json::<CredentialResponse>();
    assert!(!toggled.is_enabled);

    let deleted = server
        .delete("/v1/providers/google-api")
        .add_header("x-user-id", TEST_USER_ID)
        .await;
    assert_eq!(deleted.status_code(), 204);

    let again = server
        .delete("/v1/providers/google-api")
        .add_header("x-user-id", TEST_USER_ID)
        .await;
    assert_eq!(again.status_code(), 404);
}

#[tokio::test]
async fn test_disabled_key_falls_back_to_missing_credential() {
    let (server, mock) = setup_test_server(ResponseTemplate::new("unused"));

    server
        .post("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({
            "provider": "google-api",
            "api_key": "AIza-user",
            "is_enabled": false
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/v1/chat/stream")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&chat_request("google-api/gemini-1.5-pro"))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(mock.open_calls(), 0);
}

#[tokio::test]
async fn test_rejects_unknown_or_gateway_providers() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    let unknown = server
        .post("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({"provider": "azure", "api_key": "k"}))
        .await;
    assert_eq!(unknown.status_code(), 400);
    assert_eq!(
        unknown.json::<ErrorResponse>().error.param.as_deref(),
        Some("provider")
    );

    let gateway = server
        .post("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({"provider": "gateway", "api_key": "k"}))
        .await;
    assert_eq!(gateway.status_code(), 400);

    let blank = server
        .post("/v1/providers")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({"provider": "openrouter", "api_key": "   "}))
        .await;
    assert_eq!(blank.status_code(), 400);
}

#[tokio::test]
async fn test_toggle_missing_credential_is_404() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    let response = server
        .patch("/v1/providers/openrouter")
        .add_header("x-user-id", TEST_USER_ID)
        .json(&serde_json::json!({"is_enabled": true}))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_model_catalog() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    let catalog = server.get("/v1/models").await.json::<ModelsResponse>();
    assert_eq!(catalog.default_model, "google-api/gemini-1.5-pro");
    let providers: Vec<_> = catalog.providers.iter().map(|p| p.provider.as_str()).collect();
    assert_eq!(providers, vec!["google-api", "openrouter"]);

    let model = server
        .get("/v1/models/openrouter/anthropic/claude-3-haiku")
        .await
        .json::<ModelInfo>();
    assert_eq!(model.name, "Claude 3 Haiku");
    assert_eq!(model.provider, "openrouter");

    let missing = server.get("/v1/models/openrouter/unknown/model").await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let (server, _mock) = setup_test_server(ResponseTemplate::new("unused"));

    server.get("/v1/health").await.assert_status_ok();

    let spec = server.get("/api-docs/openapi.json").await.json::<serde_json::Value>();
    assert!(spec["paths"]["/v1/chat/stream"]["post"].is_object());
}
