// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Webhook health controller.
//!
//! Keeps the Telegram webhook registration pointed at this service's public
//! URL: idempotent setup with bounded retry, drift detection against the
//! expected URL, and a conditional reset policy driven by error and
//! pending-update thresholds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::WebhookInfo;
use crate::telegram::{SetWebhookParams, TelegramClient, TelegramError};

/// Registration errors older than this window are considered stale.
const ERROR_WINDOW_SECS: i64 = 300;

/// Undelivered-update backlog above this triggers a reset.
const PENDING_UPDATE_THRESHOLD: i64 = 10;

/// Full delete-wait-set-verify sequences attempted before giving up.
const SETUP_MAX_ATTEMPTS: u32 = 3;

/// Wait after `deleteWebhook` so the delete propagates upstream; Telegram
/// can reject a set issued immediately after a delete.
const DELETE_PROPAGATION_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook setup failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: TelegramError,
    },

    #[error("webhook setup cancelled by shutdown")]
    Cancelled,

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

/// Bounded retry schedule with linearly increasing backoff.
///
/// Modeled as a plain state machine (attempt counter plus backoff
/// function) so the policy unit-tests without wall-clock sleeps.
#[derive(Debug)]
pub struct RetrySchedule {
    max_attempts: u32,
    attempt: u32,
}

impl RetrySchedule {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempt: 0,
        }
    }

    /// Register a failed attempt. Returns the delay before the next try,
    /// or `None` once attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.attempt) * 2))
        }
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempt
    }
}

/// Outcome of a drift evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftVerdict {
    pub needs_reset: bool,
    pub reason: Option<&'static str>,
}

impl DriftVerdict {
    fn healthy() -> Self {
        Self {
            needs_reset: false,
            reason: None,
        }
    }

    fn reset(reason: &'static str) -> Self {
        Self {
            needs_reset: true,
            reason: Some(reason),
        }
    }
}

/// Decide whether the current registration has drifted from expectation.
/// Pure function of the snapshot, the expected URL, and the clock.
pub fn evaluate_drift(info: &WebhookInfo, expected_url: &str, now: DateTime<Utc>) -> DriftVerdict {
    if info.url != expected_url {
        return DriftVerdict::reset("URL mismatch");
    }

    if let Some(error_date) = info.last_error_date {
        if now.timestamp() - error_date < ERROR_WINDOW_SECS {
            return DriftVerdict::reset("Recent errors detected");
        }
    }

    if info.pending_update_count > PENDING_UPDATE_THRESHOLD {
        return DriftVerdict::reset("Too many pending updates");
    }

    DriftVerdict::healthy()
}

/// Health status of the current registration: unhealthy while the last
/// delivery error is within the trailing window, healthy otherwise.
pub fn registration_status(info: &WebhookInfo, now: DateTime<Utc>) -> &'static str {
    match info.last_error_date {
        Some(error_date) if now.timestamp() - error_date < ERROR_WINDOW_SECS => "unhealthy",
        _ => "healthy",
    }
}

/// Result of [`WebhookController::ensure_registered`].
#[derive(Debug, Clone, Copy)]
pub struct RegisterOutcome {
    /// Whether the post-set verification read matched the expected URL.
    /// A mismatch is a warning-level condition, not a failure.
    pub verified: bool,
}

/// Result of [`WebhookController::auto_reset`].
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub reset: bool,
    pub reason: Option<&'static str>,
}

pub struct WebhookController {
    telegram: TelegramClient,
    secret_token: Option<String>,
}

impl WebhookController {
    pub fn new(telegram: TelegramClient, secret_token: Option<String>) -> Self {
        Self {
            telegram,
            secret_token,
        }
    }

    /// Idempotent webhook setup: delete, wait for propagation, set, verify.
    ///
    /// The whole sequence is retried up to [`SETUP_MAX_ATTEMPTS`] times with
    /// linearly increasing backoff. Exhaustion is an error the caller must
    /// treat as non-fatal: the service keeps running and pull delivery
    /// remains available as a fallback.
    pub async fn ensure_registered(
        &self,
        expected_url: &str,
        shutdown: &CancellationToken,
    ) -> Result<RegisterOutcome, WebhookError> {
        let mut schedule = RetrySchedule::new(SETUP_MAX_ATTEMPTS);

        loop {
            match self.register_once(expected_url, shutdown).await {
                Ok(outcome) => return Ok(outcome),
                Err(WebhookError::Telegram(e)) => {
                    match schedule.next_delay() {
                        Some(delay) => {
                            warn!(
                                attempt = schedule.attempts_made(),
                                delay_secs = delay.as_secs(),
                                error = %e,
                                "webhook setup failed, retrying"
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = shutdown.cancelled() => return Err(WebhookError::Cancelled),
                            }
                        }
                        None => {
                            return Err(WebhookError::RetriesExhausted {
                                attempts: schedule.attempts_made(),
                                last: e,
                            });
                        }
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// One delete-wait-set-verify pass.
    async fn register_once(
        &self,
        expected_url: &str,
        shutdown: &CancellationToken,
    ) -> Result<RegisterOutcome, WebhookError> {
        self.telegram.delete_webhook(false).await?;

        tokio::select! {
            _ = tokio::time::sleep(DELETE_PROPAGATION_DELAY) => {}
            _ = shutdown.cancelled() => return Err(WebhookError::Cancelled),
        }

        self.telegram
            .set_webhook(SetWebhookParams {
                url: expected_url,
                secret_token: self.secret_token.as_deref(),
                drop_pending_updates: false,
            })
            .await?;

        let info = self.telegram.get_webhook_info().await?;
        let verified = info.url == expected_url;
        if verified {
            info!(url = expected_url, "webhook registered");
        } else {
            warn!(
                expected = expected_url,
                actual = %info.url,
                "webhook registration verification mismatch"
            );
        }

        Ok(RegisterOutcome { verified })
    }

    /// Force a (re)registration with the backlog dropped.
    pub async fn force_set(&self, expected_url: &str) -> Result<RegisterOutcome, WebhookError> {
        self.telegram
            .set_webhook(SetWebhookParams {
                url: expected_url,
                secret_token: self.secret_token.as_deref(),
                drop_pending_updates: true,
            })
            .await?;

        let info = self.telegram.get_webhook_info().await?;
        Ok(RegisterOutcome {
            verified: info.url == expected_url,
        })
    }

    /// Evaluate drift and reset the registration if needed.
    ///
    /// On reset the pending backlog is discarded: after a detected fault we
    /// favor forward progress over replaying a stale queue.
    pub async fn auto_reset(&self, expected_url: &str) -> Result<ResetOutcome, WebhookError> {
        let info = self.telegram.get_webhook_info().await?;
        let verdict = evaluate_drift(&info, expected_url, Utc::now());

        if !verdict.needs_reset {
            return Ok(ResetOutcome {
                reset: false,
                reason: None,
            });
        }

        info!(reason = ?verdict.reason, "webhook drift detected, resetting");
        self.force_set(expected_url).await?;

        Ok(ResetOutcome {
            reset: true,
            reason: verdict.reason,
        })
    }

    pub async fn snapshot(&self) -> Result<WebhookInfo, WebhookError> {
        Ok(self.telegram.get_webhook_info().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(url: &str, pending: i64, last_error: Option<i64>) -> WebhookInfo {
        WebhookInfo {
            url: url.to_string(),
            pending_update_count: pending,
            last_error_date: last_error,
            last_error_message: None,
            max_connections: Some(40),
        }
    }

    #[test]
    fn drift_on_url_mismatch() {
        let now = Utc::now();
        let verdict = evaluate_drift(&info("https://a/webhook", 0, None), "https://b/webhook", now);
        assert_eq!(verdict, DriftVerdict::reset("URL mismatch"));
    }

    #[test]
    fn drift_on_pending_backlog() {
        let now = Utc::now();
        let verdict = evaluate_drift(&info("https://x", 15, None), "https://x", now);
        assert_eq!(verdict, DriftVerdict::reset("Too many pending updates"));

        // At the threshold is still fine.
        let verdict = evaluate_drift(&info("https://x", 10, None), "https://x", now);
        assert!(!verdict.needs_reset);
    }

    #[test]
    fn drift_on_recent_errors_only() {
        let now = Utc::now();

        let recent = now.timestamp() - 10;
        let verdict = evaluate_drift(&info("https://x", 0, Some(recent)), "https://x", now);
        assert_eq!(verdict, DriftVerdict::reset("Recent errors detected"));

        let stale = now.timestamp() - 600;
        let verdict = evaluate_drift(&info("https://x", 0, Some(stale)), "https://x", now);
        assert!(!verdict.needs_reset);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn url_mismatch_wins_over_other_reasons() {
        let now = Utc::now();
        let snapshot = info("https://a/webhook", 50, Some(now.timestamp() - 5));
        let verdict = evaluate_drift(&snapshot, "https://b/webhook", now);
        assert_eq!(verdict.reason, Some("URL mismatch"));
    }

    #[test]
    fn registration_status_tracks_error_window() {
        let now = Utc::now();
        assert_eq!(registration_status(&info("https://x", 0, None), now), "healthy");
        assert_eq!(
            registration_status(&info("https://x", 0, Some(now.timestamp() - 10)), now),
            "unhealthy"
        );
        assert_eq!(
            registration_status(&info("https://x", 0, Some(now.timestamp() - 600)), now),
            "healthy"
        );
    }

    #[test]
    fn retry_schedule_backs_off_linearly_then_stops() {
        let mut schedule = RetrySchedule::new(3);
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(schedule.next_delay(), None);
        assert_eq!(schedule.attempts_made(), 3);
    }

    #[test]
    fn retry_schedule_with_single_attempt_never_waits() {
        let mut schedule = RetrySchedule::new(1);
        assert_eq!(schedule.next_delay(), None);
    }
}
