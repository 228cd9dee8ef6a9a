// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! Authentication state machine.
//!
//! Per-user states: `Unauthenticated` → `Authenticated-NoCredential` →
//! `Authenticated-Usable`, and back to `Unauthenticated` on logout or
//! invalidation. The transitions live here; the flags themselves are
//! persisted through [`UserAuthStore`].

use std::sync::Arc;

use tracing::{info, warn};

use super::cipher::{CipherError, CredentialCipher};
use crate::models::UserAuthRecord;
use crate::storage::{StorageError, UserAuthStore};

/// Result of an authentication check.
///
/// A user is usable-authenticated only when BOTH flags hold. Gating any
/// credential-bearing call on a single flag is a bug.
#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub has_valid_credential: bool,
    pub record: Option<UserAuthRecord>,
}

impl AuthStatus {
    fn denied() -> Self {
        Self {
            is_authenticated: false,
            has_valid_credential: false,
            record: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.is_authenticated && self.has_valid_credential
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Login, check, and invalidation logic over the record store.
pub struct AuthService {
    store: Arc<UserAuthStore>,
    cipher: CredentialCipher,
}

impl AuthService {
    pub fn new(store: Arc<UserAuthStore>, cipher: CredentialCipher) -> Self {
        Self { store, cipher }
    }

    /// Compute the user's authentication status. Fail closed: any internal
    /// error yields the unauthenticated default rather than propagating.
    ///
    /// A ghost record (`is_authenticated` set but no decryptable
    /// credential) is repaired here by clearing it, so the next check
    /// starts from a consistent unauthenticated state. The returned status
    /// still reports the pre-repair flags.
    pub async fn check(&self, user_key: &str) -> AuthStatus {
        let record = match self.store.get(user_key).await {
            Ok(Some(record)) => record,
            Ok(None) => return AuthStatus::denied(),
            Err(e) => {
                warn!(user_key, error = %e, "auth check failed to read record");
                return AuthStatus::denied();
            }
        };

        if !record.is_authenticated {
            return AuthStatus::denied();
        }

        let has_valid_credential = match &record.encrypted_credential {
            Some(token) => self.cipher.decrypt(token).is_ok(),
            None => false,
        };

        if !has_valid_credential {
            warn!(user_key, "ghost-authenticated record detected, clearing");
            if let Err(e) = self.store.clear_credentials(user_key).await {
                warn!(user_key, error = %e, "failed to repair ghost record");
            }
        }

        AuthStatus {
            is_authenticated: record.is_authenticated,
            has_valid_credential,
            record: Some(record),
        }
    }

    /// Decrypted bearer credential, only for a usable-authenticated user.
    pub async fn access_token(&self, user_key: &str) -> Option<String> {
        let status = self.check(user_key).await;
        if !status.is_usable() {
            return None;
        }
        let token = status.record?.encrypted_credential?;
        self.cipher.decrypt(&token).ok()
    }

    /// Persist a completed Privy login.
    ///
    /// A supplied credential is encrypted unless it already matches our
    /// cipher format, so callback re-delivery never double-encrypts.
    pub async fn complete_login(
        &self,
        user_key: &str,
        provider_user_id: Option<&str>,
        credential: Option<&str>,
    ) -> Result<UserAuthRecord, AuthFlowError> {
        let stored_credential = match credential {
            Some(raw) if CredentialCipher::is_valid_token(raw) => Some(raw.to_string()),
            Some(raw) => Some(self.cipher.encrypt(raw)?),
            None => None,
        };

        let record = self
            .store
            .put(user_key, true, provider_user_id, stored_credential.as_deref())
            .await?;

        info!(user_key, provider_user_id = ?provider_user_id, "login completed");
        Ok(record)
    }

    /// Clear a credential that expired or was revoked upstream.
    pub async fn invalidate(&self, user_key: &str) -> Result<(), AuthFlowError> {
        warn!(user_key, "invalidating stored credential");
        self.store.clear_credentials(user_key).await?;
        Ok(())
    }

    /// User-initiated logout. Same stored effect as [`Self::invalidate`],
    /// kept separate for caller intent.
    pub async fn logout(&self, user_key: &str) -> Result<(), AuthFlowError> {
        info!(user_key, "logout");
        self.store.clear_credentials(user_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, AuthService) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(UserAuthStore::open(dir.path()).unwrap());
        let cipher = CredentialCipher::new("test-secret");
        (dir, AuthService::new(store, cipher))
    }

    #[tokio::test]
    async fn never_seen_user_is_denied() {
        let (_dir, auth) = service();
        let status = auth.check("999").await;
        assert!(!status.is_authenticated);
        assert!(!status.has_valid_credential);
        assert!(status.record.is_none());
    }

    #[tokio::test]
    async fn login_produces_usable_state() {
        let (_dir, auth) = service();
        auth.complete_login("1", Some("did:privy:u1"), Some("raw-token"))
            .await
            .unwrap();

        let status = auth.check("1").await;
        assert!(status.is_usable());
        let record = status.record.unwrap();
        assert_eq!(record.provider_user_id.as_deref(), Some("did:privy:u1"));

        assert_eq!(auth.access_token("1").await.as_deref(), Some("raw-token"));
    }

    #[tokio::test]
    async fn login_stores_credential_encrypted() {
        let (_dir, auth) = service();
        let record = auth
            .complete_login("1", Some("pid"), Some("raw-token"))
            .await
            .unwrap();

        let stored = record.encrypted_credential.unwrap();
        assert_ne!(stored, "raw-token");
        assert!(CredentialCipher::is_valid_token(&stored));
    }

    #[tokio::test]
    async fn redelivered_encrypted_credential_is_not_double_encrypted() {
        let (_dir, auth) = service();
        let first = auth
            .complete_login("1", Some("pid"), Some("raw-token"))
            .await
            .unwrap();
        let stored = first.encrypted_credential.unwrap();

        let second = auth
            .complete_login("1", Some("pid"), Some(&stored))
            .await
            .unwrap();
        assert_eq!(second.encrypted_credential.as_deref(), Some(&*stored));
        assert_eq!(auth.access_token("1").await.as_deref(), Some("raw-token"));
    }

    #[tokio::test]
    async fn login_without_credential_is_authenticated_but_not_usable() {
        let (_dir, auth) = service();
        auth.complete_login("1", Some("pid"), None).await.unwrap();

        let status = auth.check("1").await;
        // First check observes the authenticated-but-unusable state...
        assert!(status.is_authenticated);
        assert!(!status.has_valid_credential);
        assert!(!status.is_usable());

        // ...and repairs it, so the next one starts clean.
        let status = auth.check("1").await;
        assert!(!status.is_authenticated);
    }

    #[tokio::test]
    async fn ghost_record_with_corrupted_credential_is_detected_and_repaired() {
        let (dir, auth) = service();
        // Write an authenticated record whose ciphertext cannot decrypt.
        let store = UserAuthStore::open(dir.path()).unwrap();
        store
            .put("1", true, Some("pid"), Some("not-a-cipher-token"))
            .await
            .unwrap();

        let status = auth.check("1").await;
        assert!(status.is_authenticated);
        assert!(!status.has_valid_credential);

        let repaired = store.get("1").await.unwrap().unwrap();
        assert!(!repaired.is_authenticated);
        assert!(repaired.encrypted_credential.is_none());
    }

    #[tokio::test]
    async fn invalidate_and_logout_revoke_authentication() {
        let (_dir, auth) = service();

        auth.complete_login("1", Some("pid"), Some("tok")).await.unwrap();
        auth.invalidate("1").await.unwrap();
        assert!(!auth.check("1").await.is_authenticated);

        auth.complete_login("1", Some("pid"), Some("tok")).await.unwrap();
        auth.logout("1").await.unwrap();
        let status = auth.check("1").await;
        assert!(!status.is_authenticated);
        assert!(auth.access_token("1").await.is_none());
    }
}
