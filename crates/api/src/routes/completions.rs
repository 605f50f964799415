use crate::{
    models::*,
    routes::{
        api::AppState,
        common::{error_response, map_completion_error_to_status, user_id_from_headers},
    },
};
use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::stream::StreamExt;
use inference_providers::ChatMessage;
use services::RouteRequest;
use std::convert::Infallible;
use std::time::Duration;
use tracing::debug;

fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|msg| match msg.role.as_str() {
            "system" => ChatMessage::system(msg.content.clone()),
            "assistant" => ChatMessage::assistant(msg.content.clone()),
            _ => ChatMessage::user(msg.content.clone()),
        })
        .collect()
}

/// Stream a chat completion
///
/// Routes the request to the provider named by the model identifier and
/// streams canonical events as server-sent events. Each event's data is a
/// JSON object such as `{"type":"text_delta","value":"Hel"}`; the stream ends
/// after the first `done` or `error` event. Routing errors (unknown model,
/// missing credential) are returned as JSON before any stream is opened.
#[utoipa::path(
    post,
    path = "/v1/chat/stream",
    tag = "Chat",
    request_body = ChatStreamRequest,
    params(
        ("x-user-id" = Option<String>, Header, description = "Caller whose stored provider keys take precedence")
    ),
    responses(
        (status = 200, description = "Event stream", body = StreamEventPayload, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request or missing credential", body = ErrorResponse),
    )
)]
pub async fn chat_stream(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatStreamRequest>,
) -> Response {
    debug!(
        model = %request.model,
        messages = request.messages.len(),
        "Chat stream request"
    );
    if let Err(error) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, error, "invalid_request_error");
    }

    let route_request = RouteRequest {
        model: request.model.clone(),
        user_id: user_id_from_headers(&headers),
        messages: convert_messages(&request.messages),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    match app_state.model_router.stream(route_request).await {
        Ok(stream) => {
            // Dropping the body on client disconnect drops the routed stream,
            // which releases the upstream connection
            let sse_stream = stream.map(|event| {
                Ok::<_, Infallible>(
                    Event::default().data(serde_json::to_string(&event).unwrap_or_default()),
                )
            });

            Sse::new(sse_stream)
                .keep_alive(
                    KeepAlive::new()
                        .interval(Duration::from_secs(30))
                        .text("keep-alive-text"),
                )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(model = %request.model, error = %e, "Chat stream rejected");
            let (status, error_type) = map_completion_error_to_status(&e);
            error_response(status, e.to_string(), error_type)
        }
    }
}
