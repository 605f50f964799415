use crate::models::*;
use crate::routes::common::USER_ID_HEADER;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Model Router API",
        description = "Streams chat completions from several upstream providers as one canonical event stream.\n\n## Model identifiers\n\n- `google-api/<model>`: Google Gemini, called directly\n- `openrouter/<vendor>/<model>`: OpenRouter\n- `modelhub/<org>/<model>`: hosted open models through the gateway\n- anything else: the AI gateway, unchanged\n\nA `-thinking` suffix or a `reasoning` model name enables reasoning extraction.\n\n## Callers\n\nPass `x-user-id` to use your own stored provider keys and to see your ready ModelHub entries in `/v1/models`.",
        version = "1.0.0",
        license(
            name = "MIT",
        )
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::completions::chat_stream,
        crate::routes::models::list_models,
        crate::routes::models::get_model,
        crate::routes::providers::list_credentials,
        crate::routes::providers::save_credential,
        crate::routes::providers::toggle_credential,
        crate::routes::providers::delete_credential,
        crate::routes::model_hub::list_hub_models,
        crate::routes::model_hub::add_hub_model,
        crate::routes::model_hub::update_hub_model,
        crate::routes::model_hub::delete_hub_model,
    ),
    components(
        schemas(
            ChatStreamRequest, Message, StreamEventPayload,
            ModelsResponse, ProviderModels, ModelInfo,
            SaveCredentialRequest, ToggleCredentialRequest, CredentialResponse,
            CredentialListResponse,
            AddHubModelRequest, UpdateHubModelRequest, HubModelResponse, HubModelListResponse,
            ErrorResponse, ErrorDetail,
            crate::routes::health::HealthResponse,
        ),
    ),
    modifiers(&UserIdAddon)
    // No servers - let client determine the URL dynamically
)]
pub struct ApiDoc;

/// Documents the caller id header as a security scheme
pub struct UserIdAddon;

impl Modify for UserIdAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ID_HEADER))),
            );
        }
    }
}
