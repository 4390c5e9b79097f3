//! # Server Handlers
//!
//! HTTP route handlers. The chat completions handler is the seam between
//! the HTTP surface and the streaming pipeline: access check, outbound
//! message sanitation, then either one upstream round trip (non-streaming)
//! or a relayed byte stream.

use crate::{
    adapters::base::extract_model,
    connector,
    error::ProxyError,
    sanitize::sanitize_messages,
    schemas::ChatCompletionRequest,
    stream::relay::relay_response,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as JsonResponse, Response},
    Json,
};
use tracing::debug;

use super::AppState;

/// Chat completions endpoint, streaming and non-streaming.
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(mut request): Json<ChatCompletionRequest>,
) -> Result<Response, ProxyError> {
    let model = extract_model(&request, state.adapter().model_id());

    // Authorization was resolved here once; nothing downstream re-checks it.
    if !state.access.authorize(&model) {
        return Err(ProxyError::Forbidden(model));
    }

    let removed = sanitize_messages(&mut request.messages);
    if removed > 0 {
        debug!(removed, "cleaned contaminated fields from request messages");
    }

    if request.stream.unwrap_or(false) {
        let upstream = state.adapter().build_chat_request(&request, true)?;
        let builder = upstream.builder(&state.http_client);
        let response = connector::connect(builder, state.retry_budget()).await?;
        Ok(relay_response(response, model))
    } else {
        let body = state
            .adapter()
            .chat_completions(
                &state.http_client,
                &request,
                state.retry_budget(),
                state.request_timeout(),
            )
            .await?;
        Ok(JsonResponse(body).into_response())
    }
}

/// Health check endpoint for monitoring.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "service": "streamgate",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.adapter().name(),
    });

    (StatusCode::OK, JsonResponse(health))
}
