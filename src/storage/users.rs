// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Nation Labs

//! File-backed store for [`UserAuthRecord`]s, one JSON file per user key.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;

use super::{StorageError, StorageResult};
use crate::models::UserAuthRecord;

/// Keyed store of per-user authentication records.
///
/// The Telegram user id is treated as an opaque key. `put` and
/// `clear_credentials` are whole-record read-modify-write operations
/// guarded by `write_lock`.
pub struct UserAuthStore {
    users_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl UserAuthStore {
    /// Open (and create if needed) the store under `data_dir/users`.
    pub fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let users_dir = data_dir.as_ref().join("users");
        fs::create_dir_all(&users_dir)?;
        Ok(Self {
            users_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Fetch a record, `None` for a never-seen key.
    pub async fn get(&self, user_key: &str) -> StorageResult<Option<UserAuthRecord>> {
        let path = self.record_path(user_key)?;
        read_record(&path)
    }

    /// Upsert a record.
    ///
    /// Unsupplied optional fields keep their stored values; there is no
    /// destructive overwrite of unrelated fields. `last_login` is stamped
    /// whenever an authenticated state is written.
    pub async fn put(
        &self,
        user_key: &str,
        is_authenticated: bool,
        provider_user_id: Option<&str>,
        encrypted_credential: Option<&str>,
    ) -> StorageResult<UserAuthRecord> {
        let path = self.record_path(user_key)?;
        let _guard = self.write_lock.lock().await;

        let existing = read_record(&path)?;
        let mut record = existing.unwrap_or(UserAuthRecord {
            is_authenticated: false,
            provider_user_id: None,
            encrypted_credential: None,
            last_login: None,
        });

        record.is_authenticated = is_authenticated;
        if let Some(pid) = provider_user_id {
            record.provider_user_id = Some(pid.to_string());
        }
        if let Some(cred) = encrypted_credential {
            record.encrypted_credential = Some(cred.to_string());
        }
        if is_authenticated {
            record.last_login = Some(Utc::now());
        }

        write_record(&path, &record)?;
        Ok(record)
    }

    /// Soft-clear a user's credentials.
    ///
    /// Sets `is_authenticated=false` and drops the ciphertext while keeping
    /// `provider_user_id` and `last_login`. A missing record is a no-op.
    pub async fn clear_credentials(&self, user_key: &str) -> StorageResult<()> {
        let path = self.record_path(user_key)?;
        let _guard = self.write_lock.lock().await;

        let Some(mut record) = read_record(&path)? else {
            return Ok(());
        };

        record.is_authenticated = false;
        record.encrypted_credential = None;
        write_record(&path, &record)
    }

    fn record_path(&self, user_key: &str) -> StorageResult<PathBuf> {
        validate_key(user_key)?;
        Ok(self.users_dir.join(format!("{user_key}.json")))
    }
}

/// Keys become file names, so restrict them to a safe character set.
fn validate_key(user_key: &str) -> StorageResult<()> {
    let ok = !user_key.is_empty()
        && user_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(user_key.to_string()))
    }
}

fn read_record(path: &Path) -> StorageResult<Option<UserAuthRecord>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let record = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(record))
}

/// Write to a temp file first, then rename for atomicity.
fn write_record(path: &Path, record: &UserAuthRecord) -> StorageResult<()> {
    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, UserAuthStore) {
        let dir = TempDir::new().unwrap();
        let store = UserAuthStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn get_unknown_key_returns_none() {
        let (_dir, store) = test_store();
        assert!(store.get("424242").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_creates_and_stamps_last_login() {
        let (_dir, store) = test_store();
        let record = store
            .put("100", true, Some("did:privy:abc"), Some("ciphertext"))
            .await
            .unwrap();

        assert!(record.is_authenticated);
        assert_eq!(record.provider_user_id.as_deref(), Some("did:privy:abc"));
        assert_eq!(record.encrypted_credential.as_deref(), Some("ciphertext"));
        assert!(record.last_login.is_some());

        let loaded = store.get("100").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn put_preserves_unsupplied_fields() {
        let (_dir, store) = test_store();
        store
            .put("100", true, Some("did:privy:abc"), Some("ct-1"))
            .await
            .unwrap();

        // Credential refresh without provider id must keep it.
        let record = store.put("100", true, None, Some("ct-2")).await.unwrap();
        assert_eq!(record.provider_user_id.as_deref(), Some("did:privy:abc"));
        assert_eq!(record.encrypted_credential.as_deref(), Some("ct-2"));
    }

    #[tokio::test]
    async fn clear_credentials_is_a_soft_clear() {
        let (_dir, store) = test_store();
        store
            .put("100", true, Some("did:privy:abc"), Some("ct"))
            .await
            .unwrap();

        store.clear_credentials("100").await.unwrap();

        let record = store.get("100").await.unwrap().unwrap();
        assert!(!record.is_authenticated);
        assert!(record.encrypted_credential.is_none());
        assert_eq!(record.provider_user_id.as_deref(), Some("did:privy:abc"));
        assert!(record.last_login.is_some());
    }

    #[tokio::test]
    async fn clear_credentials_on_unknown_key_is_noop() {
        let (_dir, store) = test_store();
        store.clear_credentials("missing").await.unwrap();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_with_path_characters_are_rejected() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.get("../escape").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.put("", false, None, None).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_puts_do_not_corrupt_the_record() {
        let (_dir, store) = test_store();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put("7", true, Some("pid"), Some(&format!("ct-{i}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Last writer wins with a whole, parseable record.
        let record = store.get("7").await.unwrap().unwrap();
        assert!(record.is_authenticated);
        assert!(record.encrypted_credential.unwrap().starts_with("ct-"));
    }
}
