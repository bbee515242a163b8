use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use intake::WebhookPayload;
use tracing::instrument;

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    error_handler::AppError,
    routes::webhooks::webhook_request::WebhookRequest,
};

/// HTTP endpoint accepting a change-request webhook (§4.11 / §6).
///
/// Validates the shared secret, then delegates validation, fingerprinting
/// and enqueueing to `intake::accept_webhook` — grounded on
/// `trigger_mr_route`'s secret-check-then-dispatch shape. An optional
/// `Idempotency-Key` header (§6) is passed through and, when non-blank,
/// overrides the computed fingerprint.
#[instrument(name = "webhook_route", skip(state, headers, body), fields(repository_id = %body.repository_id))]
pub async fn webhook_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WebhookRequest>,
) -> Response {
    if state.webhook_secret.is_empty() {
        return AppError::Internal("webhook secret is not configured".into()).into_response();
    }
    if body.secret.trim() != state.webhook_secret.trim() {
        return AppError::BadRequest("invalid webhook secret".into()).into_response();
    }

    let idempotency_key = headers.get("Idempotency-Key").and_then(|v| v.to_str().ok());

    let payload = WebhookPayload {
        provider: body.provider,
        repository_id: body.repository_id,
        change_request_id: body.change_request_id,
        head_sha: body.head_sha,
    };

    match intake::accept_webhook(&state.broker, payload, idempotency_key).await {
        Ok(accepted) => ApiResponse::success(accepted).into_response_with_status(StatusCode::ACCEPTED),
        Err(e) => AppError::from(e).into_response(),
    }
}
