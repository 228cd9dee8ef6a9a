// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! # User Record Storage
//!
//! Keyed persistence for per-user authentication state.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   users/
//!     {telegram_user_id}.json   # One UserAuthRecord per user
//! ```
//!
//! ## Important Notes
//!
//! - Writes go through a temp file plus atomic rename
//! - Read-modify-write cycles for the same key are serialized through one
//!   in-process mutex, so concurrent updates cannot interleave into a
//!   corrupted record
//! - Records are never hard-deleted; logout is a soft clear

use std::io;

pub mod users;

pub use users::UserAuthStore;

/// Error type for record storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid user key: {0:?}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
