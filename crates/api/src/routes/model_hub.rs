use crate::{
    models::*,
    routes::{
        api::AppState,
        common::{error_response, map_model_hub_error_to_status, require_user},
    },
};
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::model_hub::{ModelHubEntry, ModelHubError, ModelHubStatus, NewModelHubEntry};
use uuid::Uuid;

impl From<ModelHubEntry> for HubModelResponse {
    fn from(entry: ModelHubEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            chat_model_id: entry.routing_id(),
            model_id: entry.model_id,
            name: entry.name,
            description: entry.description,
            source: entry.source,
            tags: entry.tags,
            status: entry.status.to_string(),
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

fn hub_error(error: ModelHubError) -> Response {
    let (status, error_type) = map_model_hub_error_to_status(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "ModelHub operation failed");
    }
    error_response(status, error.to_string(), error_type)
}

fn invalid_param(message: String, param: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        ResponseJson(ErrorResponse::with_param(
            message,
            "invalid_request_error".to_string(),
            param.to_string(),
        )),
    )
        .into_response()
}

fn parse_entry_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| invalid_param(format!("Invalid entry id '{id}'"), "id"))
}

/// List the caller's ModelHub entries, newest first
#[utoipa::path(
    get,
    path = "/v1/model-hub",
    tag = "ModelHub",
    params(("x-user-id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Hub entries in every status", body = HubModelListResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
    )
)]
pub async fn list_hub_models(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match app_state.model_hub.list(&user_id).await {
        Ok(entries) => ResponseJson(HubModelListResponse {
            data: entries.into_iter().map(HubModelResponse::from).collect(),
        })
        .into_response(),
        Err(e) => hub_error(e),
    }
}

/// Add a model to the caller's hub; it starts out `downloading`
#[utoipa::path(
    post,
    path = "/v1/model-hub",
    tag = "ModelHub",
    request_body = AddHubModelRequest,
    params(("x-user-id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 201, description = "Entry created", body = HubModelResponse),
        (status = 400, description = "Malformed repository id", body = ErrorResponse),
        (status = 401, description = "Missing user id", body = ErrorResponse),
        (status = 409, description = "Model already in the hub", body = ErrorResponse),
    )
)]
pub async fn add_hub_model(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddHubModelRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let new_entry = NewModelHubEntry {
        model_id: request.model_id,
        name: request.name,
        description: request.description,
        tags: request.tags,
    };
    match app_state.model_hub.add(&user_id, new_entry).await {
        Ok(entry) => (
            StatusCode::CREATED,
            ResponseJson(HubModelResponse::from(entry)),
        )
            .into_response(),
        Err(e) => hub_error(e),
    }
}

/// Update an entry's status
#[utoipa::path(
    patch,
    path = "/v1/model-hub/{id}",
    tag = "ModelHub",
    request_body = UpdateHubModelRequest,
    params(
        ("id" = String, Path, description = "Entry id"),
        ("x-user-id" = String, Header, description = "Caller's user id")
    ),
    responses(
        (status = 200, description = "Updated entry", body = HubModelResponse),
        (status = 400, description = "Unknown status or malformed id", body = ErrorResponse),
        (status = 404, description = "No such entry for this user", body = ErrorResponse),
    )
)]
pub async fn update_hub_model(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateHubModelRequest>,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let id = match parse_entry_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let status = match request.status.parse::<ModelHubStatus>() {
        Ok(status) => status,
        Err(message) => return invalid_param(message, "status"),
    };

    match app_state.model_hub.set_status(&user_id, id, status).await {
        Ok(entry) => ResponseJson(HubModelResponse::from(entry)).into_response(),
        Err(e) => hub_error(e),
    }
}

/// Remove an entry from the caller's hub
#[utoipa::path(
    delete,
    path = "/v1/model-hub/{id}",
    tag = "ModelHub",
    params(
        ("id" = String, Path, description = "Entry id"),
        ("x-user-id" = String, Header, description = "Caller's user id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such entry for this user", body = ErrorResponse),
    )
)]
pub async fn delete_hub_model(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user_id = match require_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let id = match parse_entry_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match app_state.model_hub.delete(&user_id, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            format!("No ModelHub entry with id '{id}'"),
            "not_found",
        ),
        Err(e) => hub_error(e),
    }
}
