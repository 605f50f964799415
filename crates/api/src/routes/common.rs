use crate::models::ErrorResponse;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use inference_providers::CompletionError;
use services::credentials::{CredentialSettingsError, CredentialStoreError};
use services::model_hub::{ModelHubError, ModelHubStoreError};

/// Header carrying the caller's user id; there is no session layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller's user id, if the header is present and non-blank
pub fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// Caller's user id, or a 401 response for routes that need one
pub fn require_user(headers: &HeaderMap) -> Result<String, Response> {
    user_id_from_headers(headers).ok_or_else(|| {
        error_response(
            StatusCode::UNAUTHORIZED,
            "Missing x-user-id header".to_string(),
            "unauthorized",
        )
    })
}

pub fn error_response(status: StatusCode, message: String, error_type: &str) -> Response {
    (
        status,
        ResponseJson(ErrorResponse::new(message, error_type.to_string())),
    )
        .into_response()
}

/// Map routing errors returned before the stream starts to HTTP status codes
pub fn map_completion_error_to_status(error: &CompletionError) -> (StatusCode, &'static str) {
    match error {
        CompletionError::MissingCredential { .. } => (StatusCode::BAD_REQUEST, "missing_credential"),
        CompletionError::InvalidModel(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        CompletionError::UnsupportedProvider(_) => {
            (StatusCode::BAD_REQUEST, "unsupported_provider")
        }
        CompletionError::HttpError { .. }
        | CompletionError::ProtocolError(_)
        | CompletionError::ConnectionError(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
        CompletionError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "cancelled"),
    }
}

pub fn map_settings_error_to_status(error: &CredentialSettingsError) -> (StatusCode, &'static str) {
    match error {
        CredentialSettingsError::ProviderNotConfigurable(_) | CredentialSettingsError::EmptyKey => {
            (StatusCode::BAD_REQUEST, "invalid_request_error")
        }
        CredentialSettingsError::Store(CredentialStoreError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        CredentialSettingsError::Store(CredentialStoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        }
    }
}

pub fn map_model_hub_error_to_status(error: &ModelHubError) -> (StatusCode, &'static str) {
    match error {
        ModelHubError::InvalidModelId(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        ModelHubError::Store(ModelHubStoreError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        ModelHubError::Store(ModelHubStoreError::Duplicate { .. }) => {
            (StatusCode::CONFLICT, "conflict")
        }
        ModelHubError::Store(ModelHubStoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_id_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from_headers(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(user_id_from_headers(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" u1 "));
        assert_eq!(user_id_from_headers(&headers).as_deref(), Some("u1"));
    }

    #[test]
    fn test_fail_fast_errors_are_client_errors() {
        let missing = CompletionError::MissingCredential {
            provider: "openrouter".to_string(),
        };
        assert_eq!(
            map_completion_error_to_status(&missing),
            (StatusCode::BAD_REQUEST, "missing_credential")
        );
        assert_eq!(
            map_completion_error_to_status(&CompletionError::InvalidModel("openrouter/".into())).0,
            StatusCode::BAD_REQUEST
        );
    }
}
