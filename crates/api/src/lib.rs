pub mod models;
pub mod openapi;
pub mod routes;

use crate::{
    openapi::ApiDoc,
    routes::{
        completions::chat_stream,
        health::health_check,
        model_hub::{add_hub_model, delete_hub_model, list_hub_models, update_hub_model},
        models::{get_model, list_models},
        providers::{delete_credential, list_credentials, save_credential, toggle_credential},
        AppState,
    },
};
use axum::{
    response::Html,
    routing::{get, patch, post},
    Router,
};
use config::ApiConfig;
use services::{
    credentials::CredentialStore, model_hub::ModelHubStore, CredentialResolver,
    CredentialSettings, InMemoryCredentialStore, InMemoryModelHubStore, ModelHub, ModelRouter,
    ProviderRegistry,
};
use std::sync::Arc;
use utoipa::OpenApi;

/// Build application state with the real provider backends
pub fn init_app_state(config: &ApiConfig) -> AppState {
    init_app_state_with_registry(config, ProviderRegistry::from_config(&config.providers))
}

/// Build application state around a prepared registry
///
/// Tests pass a registry with mock backends swapped in.
pub fn init_app_state_with_registry(config: &ApiConfig, registry: ProviderRegistry) -> AppState {
    let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let resolver = CredentialResolver::new(store.clone(), &config.providers);
    let hub_store: Arc<dyn ModelHubStore> = Arc::new(InMemoryModelHubStore::new());

    tracing::info!(
        gateway = %config.providers.gateway.base_url,
        google = %config.providers.google.base_url,
        openrouter = %config.providers.openrouter.base_url,
        "Provider registry initialized"
    );

    AppState {
        model_router: Arc::new(ModelRouter::new(registry, resolver)),
        credential_settings: Arc::new(CredentialSettings::new(store)),
        model_hub: Arc::new(ModelHub::new(hub_store)),
    }
}

/// Build the complete application router
pub fn build_app(app_state: AppState) -> Router {
    Router::new()
        .nest(
            "/v1",
            Router::new()
                .route("/health", get(health_check))
                .merge(build_chat_routes(app_state.clone()))
                .merge(build_model_routes(app_state.clone()))
                .merge(build_model_hub_routes(app_state.clone()))
                .merge(build_provider_routes(app_state)),
        )
        .merge(build_openapi_routes())
}

pub fn build_chat_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/chat/stream", post(chat_stream))
        .with_state(app_state)
}

pub fn build_model_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/{*model_id}", get(get_model))
        .with_state(app_state)
}

pub fn build_model_hub_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/model-hub", get(list_hub_models).post(add_hub_model))
        .route(
            "/model-hub/{id}",
            patch(update_hub_model).delete(delete_hub_model),
        )
        .with_state(app_state)
}

pub fn build_provider_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/providers", get(list_credentials).post(save_credential))
        .route(
            "/providers/{provider}",
            patch(toggle_credential).delete(delete_credential),
        )
        .with_state(app_state)
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes() -> Router {
    Router::new().route("/docs", get(swagger_ui_handler)).route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// Serve Swagger UI HTML page
async fn swagger_ui_handler() -> Html<String> {
    Html(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Model Router API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-standalone-preset.js"></script>
    <script>
    window.onload = function() {
        SwaggerUIBundle({
            url: '/api-docs/openapi.json',
            dom_id: '#swagger-ui',
            deepLinking: true,
            presets: [
                SwaggerUIBundle.presets.apis,
                SwaggerUIStandalonePreset
            ],
            layout: "StandaloneLayout",
            persistAuthorization: true,
            docExpansion: 'list'
        });
    };
    </script>
</body>
</html>"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();

        assert_eq!(spec.info.title, "Model Router API");
        assert_eq!(spec.info.version, "1.0.0");

        let components = spec.components.as_ref().unwrap();
        assert!(components.schemas.contains_key("ChatStreamRequest"));
        assert!(components.schemas.contains_key("ModelsResponse"));
        assert!(components.schemas.contains_key("CredentialResponse"));
        assert!(components.schemas.contains_key("HubModelResponse"));
        assert!(components.schemas.contains_key("ErrorResponse"));
        assert!(components.security_schemes.contains_key("user_id"));

        assert!(spec.paths.paths.contains_key("/v1/chat/stream"));
        assert!(spec.paths.paths.contains_key("/v1/providers/{provider}"));
        assert!(spec.paths.paths.contains_key("/v1/model-hub/{id}"));

        // Servers are filled in by the client
        assert!(spec.servers.is_none() || spec.servers.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_swagger_ui_html_contains_required_elements() {
        let Html(html_content) = tokio_test::block_on(swagger_ui_handler());

        assert!(html_content.contains("swagger-ui-bundle.js"));
        assert!(html_content.contains("/api-docs/openapi.json"));
        assert!(html_content.contains("Model Router API Documentation"));
    }
}
