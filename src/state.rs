// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthService;
use crate::config::Config;
use crate::nation::NationClient;
use crate::telegram::TelegramClient;
use crate::webhook::WebhookController;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub telegram: Arc<TelegramClient>,
    pub nation: Arc<NationClient>,
    pub webhook: Arc<WebhookController>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth: Arc<AuthService>,
        telegram: Arc<TelegramClient>,
        nation: Arc<NationClient>,
        webhook: Arc<WebhookController>,
    ) -> Self {
        Self {
            config,
            auth,
            telegram,
            nation,
            webhook,
            started_at: Instant::now(),
        }
    }

    /// Seconds since process start, for health/liveness bodies.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
