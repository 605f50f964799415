use crate::{
    models::*,
    routes::{
        api::AppState,
        common::{error_response, map_settings_error_to_status, require_user},
    },
};
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use config::SecretString;
use services::{
    credentials::{CredentialSettingsError, MaskedCredential},
    model_router::ProviderTag,
};

impl From<MaskedCredential> for CredentialResponse {
    fn from(credential: MaskedCredential) -> Self {
        Self {
            provider: credential.provider.to_string(),
            masked_key: credential.masked_key,
            is_enabled: credential.is_enabled,
            base_url: credential.base_url,
        }
    }
}

fn parse_provider(provider: &str) -> Result<ProviderTag, Response> {
    provider.parse::<ProviderTag>().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            ResponseJson(ErrorResponse::with_param(
                e.to_string(),
                "invalid_request_error".to_string(),
                "provider".to_string(),
            )),
        )
            .into_response()
    })
}

fn settings_error(error: CredentialSettingsError) -> Response {
    let (status, error_type) = map_settings_error_to_status(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "Credential settings operation failed");
    }
    error_response(status, error.to_string(), error_type)
}

/// List the caller's provider keys (masked)
#[utoipa::path(
    get,
    path = "/v1/providers",
    tag = "Providers",
    params(("x-user-id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Stored credentials", body = CredentialListResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
    )
)]
pub async fn list_credentials(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match app_state.credential_settings.list(&user_id).await {
        Ok(credentials) => ResponseJson(CredentialListResponse {
            data: credentials.into_iter().map(CredentialResponse::from).collect(),
        })
        .into_response(),
        Err(e) => settings_error(e),
    }
}

/// Save a provider key, replacing any existing one
#[utoipa::path(
    post,
    path = "/v1/providers",
    tag = "Providers",
    request_body = SaveCredentialRequest,
    params(("x-user-id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Saved credential", body = CredentialResponse),
        (status = 400, description = "Unknown provider or empty key", body = ErrorResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
    )
)]
pub async fn save_credential(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveCredentialRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let provider = match parse_provider(&request.provider) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    match app_state
        .credential_settings
        .save(
            &user_id,
            provider,
            SecretString::new(request.api_key),
            request.base_url,
            request.is_enabled,
        )
        .await
    {
        Ok(saved) => ResponseJson(CredentialResponse::from(saved)).into_response(),
        Err(e) => settings_error(e),
    }
}

/// Enable or disable a stored key without deleting it
#[utoipa::path(
    patch,
    path = "/v1/providers/{provider}",
    tag = "Providers",
    request_body = ToggleCredentialRequest,
    params(
        ("provider" = String, Path, description = "`google-api` or `openrouter`"),
        ("x-user-id" = String, Header, description = "Caller's user id")
    ),
    responses(
        (status = 200, description = "Updated credential", body = CredentialResponse),
        (status = 404, description = "No stored key for this provider", body = ErrorResponse),
    )
)]
pub async fn toggle_credential(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ToggleCredentialRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    match app_state
        .credential_settings
        .set_enabled(&user_id, provider, request.is_enabled)
        .await
    {
        Ok(updated) => ResponseJson(CredentialResponse::from(updated)).into_response(),
        Err(e) => settings_error(e),
    }
}

/// Delete a stored key
#[utoipa::path(
    delete,
    path = "/v1/providers/{provider}",
    tag = "Providers",
    params(
        ("provider" = String, Path, description = "`google-api` or `openrouter`"),
        ("x-user-id" = String, Header, description = "Caller's user id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No stored key for this provider", body = ErrorResponse),
    )
)]
pub async fn delete_credential(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let provider = match parse_provider(&provider) {
        Ok(provider) => provider,
        Err(response) => return response,
    };

    match app_state.credential_settings.delete(&user_id, provider).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("No credential for provider '{provider}'"),
            "not_found",
        ),
        Err(e) => settings_error(e),
    }
}
