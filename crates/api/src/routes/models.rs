use crate::{
    models::{ErrorResponse, ModelInfo, ModelsResponse, ProviderModels},
    routes::{
        api::AppState,
        common::{error_response, user_id_from_headers},
    },
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::{
    catalog::{self, ChatModel, DEFAULT_CHAT_MODEL},
    model_hub::ModelHubEntry,
    model_router::ProviderTag,
};

impl From<&ChatModel> for ModelInfo {
    fn from(model: &ChatModel) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name.to_string(),
            description: model.description.to_string(),
            provider: model.provider.to_string(),
        }
    }
}

impl From<&ModelHubEntry> for ModelInfo {
    fn from(entry: &ModelHubEntry) -> Self {
        Self {
            id: entry.routing_id(),
            name: entry.name.clone(),
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| format!("Downloaded from {}", entry.source)),
            provider: ProviderTag::ModelHub.to_string(),
        }
    }
}

/// The caller's ready ModelHub entries; a failing store only hides them
async fn ready_hub_models(app_state: &AppState, headers: &HeaderMap) -> Vec<ModelHubEntry> {
    let Some(user_id) = user_id_from_headers(headers) else {
        return Vec::new();
    };
    match app_state.model_hub.ready_models(&user_id).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load ModelHub entries, listing catalog only");
            Vec::new()
        }
    }
}

/// List chat models
///
/// Curated models grouped by provider plus the default model. With
/// `x-user-id`, the caller's ready ModelHub entries are listed under
/// `modelhub`. Any identifier can be streamed, listed here or not.
#[utoipa::path(
    get,
    path = "/v1/models",
    tag = "Models",
    params(("x-user-id" = Option<String>, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Model catalog", body = ModelsResponse),
    )
)]
pub async fn list_models(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> ResponseJson<ModelsResponse> {
    let mut grouped = catalog::models_by_provider();
    let hub_models = ready_hub_models(&app_state, &headers).await;

    let providers = ProviderTag::ALL
        .iter()
        .filter_map(|&provider| {
            let mut models: Vec<ModelInfo> = grouped
                .remove(&provider)
                .unwrap_or_default()
                .iter()
                .map(ModelInfo::from)
                .collect();
            if provider == ProviderTag::ModelHub {
                models.extend(hub_models.iter().map(ModelInfo::from));
            }
            (!models.is_empty()).then(|| ProviderModels {
                provider: provider.to_string(),
                models,
            })
        })
        .collect();

    ResponseJson(ModelsResponse {
        default_model: DEFAULT_CHAT_MODEL.to_string(),
        providers,
    })
}

/// Look up one model by its full identifier
#[utoipa::path(
    get,
    path = "/v1/models/{model_id}",
    tag = "Models",
    params(
        ("model_id" = String, Path, description = "Full model identifier, slashes included"),
        ("x-user-id" = Option<String>, Header, description = "Caller's user id")
    ),
    responses(
        (status = 200, description = "Catalog or ModelHub entry", body = ModelInfo),
        (status = 404, description = "Not in the catalog", body = ErrorResponse),
    )
)]
pub async fn get_model(
    State(app_state): State<AppState>,
    Path(model_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(model) = catalog::find_model(&model_id) {
        return ResponseJson(ModelInfo::from(model)).into_response();
    }

    let hub_models = ready_hub_models(&app_state, &headers).await;
    match hub_models.iter().find(|e| e.routing_id() == model_id) {
        Some(entry) => ResponseJson(ModelInfo::from(entry)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Model '{model_id}' is not in the catalog"),
            "not_found",
        ),
    }
}
