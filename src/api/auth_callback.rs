// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Identity-provider callback: Privy notifies the gateway when a user
//! completes (or loses) authentication.

use axum::{extract::State, Json};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::{AuthCallbackRequest, AuthCallbackResponse};
use crate::state::AppState;

/// Privy → gateway authentication notification.
///
/// A supplied credential is encrypted on ingest unless it already matches
/// the cipher token format (callback re-delivery must not double-encrypt).
/// The Telegram confirmation is fire-and-forget: its failure is logged and
/// never changes this endpoint's response.
#[utoipa::path(
    post,
    path = "/auth/callback",
    tag = "Auth",
    request_body = AuthCallbackRequest,
    responses(
        (status = 200, description = "Authentication state updated", body = AuthCallbackResponse),
        (status = 400, description = "telegramUserId missing"),
        (status = 500, description = "Persistence failed")
    )
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    body: Option<Json<AuthCallbackRequest>>,
) -> Result<Json<AuthCallbackResponse>, ApiError> {
    let Some(Json(request)) = body else {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    };

    // Validation first; no state mutation on a bad request.
    let Some(user_key) = request.user_key() else {
        return Err(ApiError::bad_request("telegramUserId is required"));
    };

    let message = if request.is_authenticated {
        state
            .auth
            .complete_login(
                &user_key,
                request.privy_user_id.as_deref(),
                request.privy_access_token.as_deref(),
            )
            .await
            .map_err(|e| {
                warn!(user_key, error = %e, "auth callback failed to persist login");
                ApiError::internal("failed to persist authentication state")
            })?;

        notify_user(&state, &user_key, "You're connected to Nation. Try /status.");
        "authentication completed"
    } else {
        state.auth.invalidate(&user_key).await.map_err(|e| {
            warn!(user_key, error = %e, "auth callback failed to clear credentials");
            ApiError::internal("failed to persist authentication state")
        })?;
        "authentication cleared"
    };

    info!(user_key, authenticated = request.is_authenticated, "auth callback processed");

    Ok(Json(AuthCallbackResponse {
        success: true,
        message: message.to_string(),
    }))
}

/// Send a Telegram notification without tying it to the request's fate.
fn notify_user(state: &AppState, user_key: &str, text: &str) {
    let Ok(chat_id) = user_key.parse::<i64>() else {
        return;
    };
    let telegram = state.telegram.clone();
    let text = text.to_string();
    tokio::spawn(async move {
        if let Err(e) = telegram.send_message(chat_id, &text).await {
            warn!(chat_id, error = %e, "login confirmation message failed");
        }
    });
}
