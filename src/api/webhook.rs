// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Inbound update delivery plus webhook registration management.

use axum::{
    extract::State,
    http::{header::HOST, HeaderMap},
    Json,
};
use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::join_webhook_path;
use crate::error::ApiError;
use crate::models::{AutoResetResponse, SetWebhookResponse, Update, WebhookAck, WebhookInfo};
use crate::state::AppState;

/// Inbound Telegram update.
///
/// Acks quickly and hands the update to a background task; Telegram is
/// responsible for delivery dedup, so a re-delivered update may be
/// processed again at this layer.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhook",
    request_body = Object,
    responses(
        (status = 200, description = "Update accepted", body = WebhookAck),
        (status = 400, description = "Body missing or not a JSON object"),
        (status = 401, description = "Secret token mismatch")
    )
)]
pub async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<Json<WebhookAck>, ApiError> {
    if let Some(expected) = &state.config.webhook_secret_token {
        let provided = headers
            .get("x-telegram-bot-api-secret-token")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError::unauthorized("secret token mismatch"));
        }
    }

    let Some(Json(value)) = body else {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    };
    if !value.is_object() {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    }

    match serde_json::from_value::<Update>(value) {
        Ok(update) => {
            // Process off the request path; handler failures are logged in
            // the task and never affect the ack.
            tokio::spawn(crate::bot::handle_update(state, update));
        }
        Err(e) => {
            // Unknown update shapes are acked and skipped rather than
            // bounced, so Telegram does not redeliver them forever.
            debug!(error = %e, "ignoring unparseable update");
        }
    }

    Ok(Json(WebhookAck {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    }))
}

/// Raw registration snapshot passthrough.
#[utoipa::path(
    get,
    path = "/webhook-status",
    tag = "Webhook",
    responses(
        (status = 200, description = "Current webhook registration", body = WebhookInfo),
        (status = 500, description = "Snapshot fetch failed")
    )
)]
pub async fn webhook_status(
    State(state): State<AppState>,
) -> Result<Json<WebhookInfo>, ApiError> {
    let info = state
        .webhook
        .snapshot()
        .await
        .map_err(|e| ApiError::internal(format!("failed to fetch webhook info: {e}")))?;
    Ok(Json(info))
}

/// Force (re)registration of the webhook.
#[utoipa::path(
    post,
    path = "/set-webhook",
    tag = "Webhook",
    responses(
        (status = 200, description = "Registration attempted", body = SetWebhookResponse),
        (status = 400, description = "No webhook URL could be derived"),
        (status = 500, description = "Registration failed after retries")
    )
)]
pub async fn set_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SetWebhookResponse>, ApiError> {
    let url = expected_url(&state, &headers)?;

    // Not cancellable from here; process shutdown tears the task down with
    // the connection.
    let shutdown = CancellationToken::new();
    let outcome = state
        .webhook
        .ensure_registered(&url, &shutdown)
        .await
        .map_err(|e| {
            warn!(url, error = %e, "manual webhook registration failed");
            ApiError::internal(format!("webhook registration failed: {e}"))
        })?;

    Ok(Json(SetWebhookResponse {
        success: true,
        url,
        verified: outcome.verified,
    }))
}

/// Evaluate drift and conditionally reset the registration.
#[utoipa::path(
    post,
    path = "/auto-reset-webhook",
    tag = "Webhook",
    responses(
        (status = 200, description = "Drift evaluated", body = AutoResetResponse),
        (status = 400, description = "No webhook URL could be derived"),
        (status = 500, description = "Reset failed")
    )
)]
pub async fn auto_reset_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AutoResetResponse>, ApiError> {
    let url = expected_url(&state, &headers)?;

    let outcome = state
        .webhook
        .auto_reset(&url)
        .await
        .map_err(|e| ApiError::internal(format!("auto-reset failed: {e}")))?;

    let message = if outcome.reset {
        "webhook was reset".to_string()
    } else {
        "webhook is healthy, no reset needed".to_string()
    };

    Ok(Json(AutoResetResponse {
        success: true,
        reset: outcome.reset,
        reason: outcome.reason.map(str::to_string),
        message,
    }))
}

/// The webhook URL this deployment should be registered under:
/// `WEBHOOK_BASE_URL` when configured, otherwise derived from the
/// request's Host header.
fn expected_url(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(url) = state.config.webhook_url() {
        return Ok(url);
    }

    headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| join_webhook_path(&format!("https://{host}")))
        .ok_or_else(|| ApiError::bad_request("no WEBHOOK_BASE_URL configured and no Host header"))
}
