// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::warn;

use crate::models::{HealthResponse, KeepAliveResponse, WebhookHealth};
use crate::state::AppState;
use crate::webhook::registration_status;

/// Health check endpoint handler.
///
/// `status` is `healthy`/`unhealthy` depending on the webhook
/// registration's recent-error window, or `error` when the registration
/// snapshot itself cannot be fetched.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health with webhook snapshot", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, webhook) = match state.webhook.snapshot().await {
        Ok(info) => {
            let status = registration_status(&info, Utc::now());
            let webhook = WebhookHealth {
                url: info.url,
                pending_updates: info.pending_update_count,
                last_error_date: info.last_error_date,
                last_error_message: info.last_error_message,
            };
            (status.to_string(), Some(webhook))
        }
        Err(e) => {
            warn!(error = %e, "health check could not fetch webhook info");
            ("error".to_string(), None)
        }
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
        webhook,
    })
}

/// Trivial liveness probe for external keep-alive pingers.
#[utoipa::path(
    get,
    path = "/keep-alive",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = KeepAliveResponse)
    )
)]
pub async fn keep_alive(State(state): State<AppState>) -> Json<KeepAliveResponse> {
    Json(KeepAliveResponse {
        status: "alive".to_string(),
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
    })
}
