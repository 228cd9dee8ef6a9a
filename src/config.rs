// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TELEGRAM_BOT_TOKEN` | Bot API token | Required |
//! | `WEBHOOK_BASE_URL` | Public base URL for webhook registration | Optional |
//! | `USE_WEBHOOK` | Push (webhook) vs pull (polling) delivery | `true` |
//! | `TOKEN_ENCRYPTION_KEY` | Secret for credential encryption at rest | Required |
//! | `NATION_API_URL` | Nation account/agent API base URL | `https://api.nation.fun` |
//! | `WEBHOOK_SECRET_TOKEN` | Shared secret for inbound webhook checks | Optional |
//! | `AUTH_PAGE_URL` | Login page sent to unauthenticated users | Optional |
//! | `DATA_DIR` | Root directory for the user record store | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::{env, path::PathBuf};

const DEFAULT_NATION_API_URL: &str = "https://api.nation.fun";
const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid {
        name: &'static str,
        message: String,
    },
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// Public base URL; when absent, `POST /set-webhook` derives the URL
    /// from the request's Host header instead.
    pub webhook_base_url: Option<String>,
    /// Push (webhook) vs pull (long-polling) delivery mode.
    pub use_webhook: bool,
    /// Secret the credential encryption key is derived from.
    pub encryption_secret: String,
    pub nation_api_url: String,
    pub webhook_secret_token: Option<String>,
    pub auth_page_url: Option<String>,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let use_webhook = match env_optional("USE_WEBHOOK") {
            None => true,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "USE_WEBHOOK",
                        message: format!("expected boolean, got {other:?}"),
                    })
                }
            },
        };

        let port = env_or_default("PORT", "8080")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "PORT",
                message: format!("{e}"),
            })?;

        Ok(Self {
            bot_token: env_required("TELEGRAM_BOT_TOKEN")?,
            webhook_base_url: env_optional("WEBHOOK_BASE_URL"),
            use_webhook,
            encryption_secret: env_required("TOKEN_ENCRYPTION_KEY")?,
            nation_api_url: env_or_default("NATION_API_URL", DEFAULT_NATION_API_URL),
            webhook_secret_token: env_optional("WEBHOOK_SECRET_TOKEN"),
            auth_page_url: env_optional("AUTH_PAGE_URL"),
            data_dir: PathBuf::from(env_or_default("DATA_DIR", DEFAULT_DATA_DIR)),
            host: env_or_default("HOST", "0.0.0.0"),
            port,
        })
    }

    /// Webhook endpoint URL under the configured public base, if any.
    pub fn webhook_url(&self) -> Option<String> {
        self.webhook_base_url
            .as_ref()
            .map(|base| join_webhook_path(base))
    }
}

/// Append `/webhook` to a public base URL, tolerating trailing slashes.
pub fn join_webhook_path(base: &str) -> String {
    format!("{}/webhook", base.trim_end_matches('/'))
}

fn env_required(name: &'static str) -> Result<String, ConfigError> {
    env_optional(name).ok_or(ConfigError::Missing(name))
}

fn env_optional(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_webhook_path_handles_trailing_slash() {
        assert_eq!(
            join_webhook_path("https://bot.example.com/"),
            "https://bot.example.com/webhook"
        );
        assert_eq!(
            join_webhook_path("https://bot.example.com"),
            "https://bot.example.com/webhook"
        );
    }
}
