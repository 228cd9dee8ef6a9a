// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Telegram Bot API client.
//!
//! Thin reqwest wrapper over the handful of methods the gateway uses:
//! webhook management, message sending, and long-polling fallback.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::models::{Update, WebhookInfo};

const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Update categories the gateway subscribes to.
const ALLOWED_UPDATES: [&str; 2] = ["message", "callback_query"];

/// Upper bound on concurrent webhook deliveries from Telegram.
const MAX_CONNECTIONS: i64 = 40;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Request(String),

    #[error("Telegram API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("Telegram response was invalid: {0}")]
    InvalidResponse(String),
}

/// Parameters for `setWebhook`.
#[derive(Debug, Clone)]
pub struct SetWebhookParams<'a> {
    pub url: &'a str,
    pub secret_token: Option<&'a str>,
    pub drop_pending_updates: bool,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    // No serde(default) here: it would put a `T: Default` bound on the
    // derived impl, and a missing `Option` field is `None` anyway.
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    base_url: String,
    bot_token: String,
    http: Client,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self, TelegramError> {
        Self::with_base_url(DEFAULT_API_BASE_URL, bot_token)
    }

    pub fn with_base_url(base_url: &str, bot_token: &str) -> Result<Self, TelegramError> {
        let http = Client::builder()
            // Long-poll requests hold the connection open for up to 30 s.
            .timeout(Duration::from_secs(45))
            .build()
            .map_err(|e| TelegramError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            http,
        })
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, TelegramError> {
        self.call("getWebhookInfo", &json!({})).await
    }

    pub async fn set_webhook(&self, params: SetWebhookParams<'_>) -> Result<(), TelegramError> {
        let mut payload = json!({
            "url": params.url,
            "allowed_updates": ALLOWED_UPDATES,
            "max_connections": MAX_CONNECTIONS,
            "drop_pending_updates": params.drop_pending_updates,
        });
        if let Some(secret) = params.secret_token {
            payload["secret_token"] = Value::String(secret.to_string());
        }

        let _: bool = self.call("setWebhook", &payload).await?;
        Ok(())
    }

    /// Remove the current webhook registration. "Nothing to delete" is
    /// reported as success by the Bot API, which is what we want.
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TelegramError> {
        let payload = json!({ "drop_pending_updates": drop_pending_updates });
        let _: bool = self.call("deleteWebhook", &payload).await?;
        Ok(())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let payload = json!({ "chat_id": chat_id, "text": text });
        let _: Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }

    /// Long-poll for updates (pull delivery mode).
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", &payload).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.bot_token, method);
        debug!(method, "telegram api call");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TelegramError::Request(format!("{method}: {e}")))?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::InvalidResponse(format!("{method}: {e}")))?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::InvalidResponse(format!("{method}: missing result")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_success_and_failure() {
        let ok: ApiEnvelope<bool> =
            serde_json::from_value(json!({ "ok": true, "result": true })).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.result, Some(true));

        let err: ApiEnvelope<bool> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        }))
        .unwrap();
        assert!(!err.ok);
        assert_eq!(err.error_code, Some(401));
        assert_eq!(err.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn envelope_works_for_result_types_without_default() {
        // `Update` has no `Default` impl; the envelope must deserialize
        // for any result type `call` is instantiated with, including when
        // the `result` field is absent entirely.
        let err: ApiEnvelope<Update> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests"
        }))
        .unwrap();
        assert!(!err.ok);
        assert!(err.result.is_none());

        let ok: ApiEnvelope<Update> = serde_json::from_value(json!({
            "ok": true,
            "result": { "update_id": 7 }
        }))
        .unwrap();
        assert_eq!(ok.result.unwrap().update_id, 7);
    }

    #[test]
    fn webhook_info_parses_from_envelope_result() {
        let envelope: ApiEnvelope<WebhookInfo> = serde_json::from_value(json!({
            "ok": true,
            "result": {
                "url": "https://bot.example.com/webhook",
                "pending_update_count": 3,
                "last_error_date": 1756000000,
                "last_error_message": "connection refused"
            }
        }))
        .unwrap();

        let info = envelope.result.unwrap();
        assert_eq!(info.url, "https://bot.example.com/webhook");
        assert_eq!(info.pending_update_count, 3);
        assert_eq!(info.last_error_date, Some(1756000000));
    }
}
