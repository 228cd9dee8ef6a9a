// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! # Authentication Module
//!
//! Privy-backed authentication state for Telegram users.
//!
//! ## Auth Flow
//!
//! 1. User opens the Privy login page from the bot
//! 2. Privy calls `POST /auth/callback` with the user's bearer credential
//! 3. Gateway:
//!    - Encrypts the credential with AES-256-GCM ([`CredentialCipher`])
//!    - Persists the per-user record ([`crate::storage::UserAuthStore`])
//!    - Confirms via a Telegram message
//!
//! ## Security
//!
//! - Bearer credentials are never stored in plaintext
//! - A record whose ciphertext no longer decrypts is treated as having no
//!   credential and is repaired by clearing it (fail closed)
//! - "Usable" requires both the authenticated flag and a decryptable
//!   credential; single-flag checks are not allowed

pub mod cipher;
pub mod session;

pub use cipher::{CipherError, CredentialCipher};
pub use session::{AuthService, AuthStatus};
