// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Nation account/agent API client.
//!
//! Calls carry the user's decrypted bearer credential. A 401 response means
//! the credential expired or was revoked upstream and maps to
//! [`NationError::Unauthorized`]; callers react by invalidating the stored
//! credential and prompting re-authentication. 403 and other failures do
//! NOT clear credentials.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{AccountSummary, AgentSummary};

#[derive(Debug, thiserror::Error)]
pub enum NationError {
    /// Credential rejected upstream (HTTP 401). The only variant that
    /// should trigger credential invalidation.
    #[error("Nation API rejected the credential")]
    Unauthorized,

    /// Authenticated but not allowed (HTTP 403).
    #[error("Nation API denied access: {0}")]
    Forbidden(String),

    #[error("Nation API request failed: {0}")]
    Request(String),

    #[error("Nation API response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct NationClient {
    base_url: String,
    http: Client,
}

impl NationClient {
    pub fn new(base_url: &str) -> Result<Self, NationError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NationError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn get_account(&self, access_token: &str) -> Result<AccountSummary, NationError> {
        self.get_json("/v1/account", access_token).await
    }

    pub async fn list_agents(&self, access_token: &str) -> Result<Vec<AgentSummary>, NationError> {
        self.get_json("/v1/agents", access_token).await
    }

    pub async fn get_agent(
        &self,
        access_token: &str,
        agent_id: &str,
    ) -> Result<AgentSummary, NationError> {
        self.get_json(&format!("/v1/agents/{agent_id}"), access_token)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
    ) -> Result<T, NationError> {
        let url = format!("{}{path}", self.base_url);
        debug!(path, "nation api call");

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| NationError::Request(format!("{path}: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(NationError::Unauthorized),
            StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                return Err(NationError::Forbidden(body));
            }
            status if !status.is_success() => {
                return Err(NationError::Request(format!("{path}: HTTP {status}")));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| NationError::InvalidResponse(format!("{path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = NationClient::new("https://api.nation.fun/").unwrap();
        assert_eq!(client.base_url, "https://api.nation.fun");
    }

    #[test]
    fn only_unauthorized_should_clear_credentials() {
        // The error taxonomy is part of the contract: 401 invalidates,
        // everything else surfaces as a plain failure.
        let unauthorized = NationError::Unauthorized;
        assert!(matches!(unauthorized, NationError::Unauthorized));

        let forbidden = NationError::Forbidden("nope".into());
        assert!(!matches!(forbidden, NationError::Unauthorized));
    }
}
