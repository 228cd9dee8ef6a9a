// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Shared data types: persisted auth records, Telegram wire types, and
//! HTTP request/response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Per-user authentication state, one JSON file per Telegram user key.
///
/// `encrypted_credential` is always the cipher token produced by
/// [`crate::auth::CredentialCipher`]; a plaintext bearer credential is
/// never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserAuthRecord {
    /// Whether the user completed the Privy login flow.
    pub is_authenticated: bool,
    /// Privy's own user id, set on successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
    /// Encrypted bearer credential (cipher token), absent after logout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_credential: Option<String>,
    /// Last successful login. Kept through logout for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Telegram Bot API wire types (subset the gateway consumes)
// ---------------------------------------------------------------------------

/// Webhook registration snapshot returned by `getWebhookInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    /// Unix timestamp of the most recent delivery error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
}

/// A single inbound update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Nation API types
// ---------------------------------------------------------------------------

/// Account summary returned by the Nation API.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Agent summary returned by the Nation API.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// HTTP surface bodies
// ---------------------------------------------------------------------------

/// Identity-provider callback payload.
///
/// `telegramUserId` arrives as a string or a bare integer depending on the
/// caller, so it is kept as raw JSON and normalized via [`Self::user_key`].
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthCallbackRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub telegram_user_id: Option<Value>,
    #[serde(default)]
    pub privy_user_id: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub privy_access_token: Option<String>,
}

impl AuthCallbackRequest {
    /// Normalize the Telegram user id to an opaque string key.
    pub fn user_key(&self) -> Option<String> {
        match &self.telegram_user_id {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthCallbackResponse {
    pub success: bool,
    pub message: String,
}

/// Ack body for `POST /webhook`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Webhook section of the `/health` body.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookHealth {
    pub url: String,
    pub pending_updates: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since process start.
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookHealth>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KeepAliveResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetWebhookResponse {
    pub success: bool,
    pub url: String,
    /// False when the post-set verification read did not match.
    pub verified: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoResetResponse {
    pub success: bool,
    pub reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
}
