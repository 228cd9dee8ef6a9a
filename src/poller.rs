// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! # Update Poller
//!
//! Pull-based delivery fallback: when webhook mode is disabled the gateway
//! long-polls `getUpdates` instead. Each fetched update is handled in its
//! own task so one slow handler cannot stall the poll loop.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, the
//! same pattern as the webhook setup retries.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::AppState;

/// Long-poll timeout passed to the Bot API.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed poll before trying again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct UpdatePoller {
    state: AppState,
}

impl UpdatePoller {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Run the poll loop until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("update poller starting (pull delivery mode)");
        let mut offset: Option<i64> = None;

        loop {
            if shutdown.is_cancelled() {
                info!("update poller shutting down");
                return;
            }

            let poll = self.state.telegram.get_updates(offset, POLL_TIMEOUT_SECS);
            let updates = tokio::select! {
                result = poll => result,
                _ = shutdown.cancelled() => {
                    info!("update poller shutting down");
                    return;
                }
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let state = self.state.clone();
                        tokio::spawn(crate::bot::handle_update(state, update));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                        _ = shutdown.cancelled() => {
                            info!("update poller shutting down");
                            return;
                        }
                    }
                }
            }
        }
    }
}
