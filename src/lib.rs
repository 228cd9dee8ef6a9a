// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Nation Agent Gateway
//!
//! Telegram-facing gateway for Nation agents: Privy-backed authentication,
//! AES-GCM-encrypted credential storage, account/agent proxying, and
//! webhook registration health.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential cipher and authentication state machine
//! - `bot` - Inbound Telegram update dispatch
//! - `storage` - File-backed per-user auth records
//! - `telegram` / `nation` - Outbound API clients
//! - `webhook` - Webhook registration health controller

pub mod api;
pub mod auth;
pub mod bot;
pub mod config;
pub mod error;
pub mod models;
pub mod nation;
pub mod poller;
pub mod state;
pub mod storage;
pub mod telegram;
pub mod webhook;
