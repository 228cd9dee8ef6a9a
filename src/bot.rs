// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Inbound update dispatch.
//!
//! Routes the few commands the gateway answers itself. Every gate on a
//! credential-bearing Nation call goes through the auth service and
//! requires a usable credential; a 401 from the Nation API invalidates the
//! stored credential BEFORE the re-authentication prompt is sent, so the
//! two effects stay causally ordered within the handling task.

use tracing::{debug, warn};

use crate::models::Update;
use crate::nation::NationError;
use crate::state::AppState;

/// Handle one inbound update. Errors are logged, never propagated: a bad
/// update must not take the delivery path down.
pub async fn handle_update(state: AppState, update: Update) {
    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "ignoring non-message update");
        return;
    };

    let chat_id = message.chat.id;
    let Some(user) = message.from else {
        return;
    };
    let user_key = user.id.to_string();

    let text = message.text.unwrap_or_default();
    let command = text.split_whitespace().next().unwrap_or("");

    let result = match command {
        "/start" | "/help" => send(&state, chat_id, START_TEXT).await,
        "/login" => handle_login(&state, &user_key, chat_id).await,
        "/status" => handle_status(&state, &user_key, chat_id).await,
        "/agents" => handle_agents(&state, &user_key, chat_id).await,
        "/logout" => handle_logout(&state, &user_key, chat_id).await,
        _ => send(&state, chat_id, "Unknown command. Try /help.").await,
    };

    if let Err(e) = result {
        warn!(chat_id, command, error = %e, "update handling failed");
    }
}

const START_TEXT: &str = "Welcome to Nation. Commands:\n\
    /login - link your Nation account\n\
    /status - account overview\n\
    /agents - your agents\n\
    /logout - unlink this chat";

async fn handle_login(
    state: &AppState,
    user_key: &str,
    chat_id: i64,
) -> Result<(), crate::telegram::TelegramError> {
    if state.auth.check(user_key).await.is_usable() {
        return send(state, chat_id, "You are already logged in.").await;
    }

    let text = match &state.config.auth_page_url {
        Some(url) => format!("Log in here, then come back: {url}"),
        None => "Open the Nation app to link your account.".to_string(),
    };
    send(state, chat_id, &text).await
}

async fn handle_status(
    state: &AppState,
    user_key: &str,
    chat_id: i64,
) -> Result<(), crate::telegram::TelegramError> {
    let Some(token) = state.auth.access_token(user_key).await else {
        return send(state, chat_id, "You are not logged in. Use /login first.").await;
    };

    match state.nation.get_account(&token).await {
        Ok(account) => {
            let name = account
                .username
                .or(account.email)
                .unwrap_or_else(|| account.id.clone());
            send(state, chat_id, &format!("Logged in as {name}.")).await
        }
        Err(e) => report_nation_error(state, user_key, chat_id, e).await,
    }
}

async fn handle_agents(
    state: &AppState,
    user_key: &str,
    chat_id: i64,
) -> Result<(), crate::telegram::TelegramError> {
    let Some(token) = state.auth.access_token(user_key).await else {
        return send(state, chat_id, "You are not logged in. Use /login first.").await;
    };

    match state.nation.list_agents(&token).await {
        Ok(agents) if agents.is_empty() => send(state, chat_id, "No agents yet.").await,
        Ok(agents) => {
            let lines: Vec<String> = agents
                .iter()
                .map(|a| {
                    format!(
                        "- {} ({})",
                        a.name.as_deref().unwrap_or(&a.id),
                        a.status.as_deref().unwrap_or("unknown")
                    )
                })
                .collect();
            send(state, chat_id, &lines.join("\n")).await
        }
        Err(e) => report_nation_error(state, user_key, chat_id, e).await,
    }
}

async fn handle_logout(
    state: &AppState,
    user_key: &str,
    chat_id: i64,
) -> Result<(), crate::telegram::TelegramError> {
    if let Err(e) = state.auth.logout(user_key).await {
        warn!(user_key, error = %e, "logout failed");
        return send(state, chat_id, "Logout failed, please try again.").await;
    }
    send(state, chat_id, "Logged out.").await
}

/// Map a Nation API failure to a user message. An expired credential is
/// invalidated first, then reported; other failures leave it untouched.
async fn report_nation_error(
    state: &AppState,
    user_key: &str,
    chat_id: i64,
    error: NationError,
) -> Result<(), crate::telegram::TelegramError> {
    match error {
        NationError::Unauthorized => {
            if let Err(e) = state.auth.invalidate(user_key).await {
                warn!(user_key, error = %e, "failed to invalidate expired credential");
            }
            send(
                state,
                chat_id,
                "Your session expired. Use /login to reconnect.",
            )
            .await
        }
        NationError::Forbidden(_) => {
            send(state, chat_id, "You don't have access to that.").await
        }
        other => {
            warn!(user_key, error = %other, "nation api call failed");
            send(state, chat_id, "Something went wrong, please try again later.").await
        }
    }
}

async fn send(
    state: &AppState,
    chat_id: i64,
    text: &str,
) -> Result<(), crate::telegram::TelegramError> {
    state.telegram.send_message(chat_id, text).await
}
