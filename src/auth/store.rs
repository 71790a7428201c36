//! Credential Storage
//!
//! Injectable key/value storage for the access/refresh token pair.

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StorageError;
use crate::types::Credentials;

/// Fixed key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Fixed key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Credential storage interface.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the stored credentials, `None` when signed out.
    async fn read(&self) -> Result<Option<Credentials>, StorageError>;

    /// Replace the stored credentials.
    async fn write(&self, credentials: Credentials) -> Result<(), StorageError>;

    /// Replace only the access token, keeping the refresh token.
    async fn write_access_token(&self, access_token: SecretString) -> Result<(), StorageError>;

    /// Remove all stored credentials.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: Mutex<Option<Credentials>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that starts signed in.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn read(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.credentials.lock().clone())
    }

    async fn write(&self, credentials: Credentials) -> Result<(), StorageError> {
        *self.credentials.lock() = Some(credentials);
        Ok(())
    }

    async fn write_access_token(&self, access_token: SecretString) -> Result<(), StorageError> {
        let mut guard = self.credentials.lock();
        match guard.as_mut() {
            Some(existing) => existing.access_token = access_token,
            None => {
                *guard = Some(Credentials {
                    access_token,
                    refresh_token: None,
                })
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.credentials.lock() = None;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries(HashMap<String, String>);

/// Persistent credential store backed by a JSON key/value file.
///
/// Tokens live under the fixed keys [`ACCESS_TOKEN_KEY`] and
/// [`REFRESH_TOKEN_KEY`]. Other keys in the file are preserved.
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Create a store persisting to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoredEntries, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StoredEntries::default()),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StorageError::CorruptedData {
                    message: format!("{}: {}", self.path.display(), e),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredEntries::default()),
            Err(e) => Err(StorageError::ReadFailed {
                message: format!("{}: {}", self.path.display(), e),
            }),
        }
    }

    async fn save(&self, entries: &StoredEntries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed {
                    message: format!("{}: {}", parent.display(), e),
                })?;
        }

        let contents =
            serde_json::to_string_pretty(entries).map_err(|e| StorageError::WriteFailed {
                message: e.to_string(),
            })?;

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| StorageError::WriteFailed {
                message: format!("{}: {}", self.path.display(), e),
            })
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn read(&self) -> Result<Option<Credentials>, StorageError> {
        let mut entries = self.load().await?;

        Ok(entries
            .0
            .remove(ACCESS_TOKEN_KEY)
            .map(|access| Credentials::new(access, entries.0.remove(REFRESH_TOKEN_KEY))))
    }

    async fn write(&self, credentials: Credentials) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;

        entries.0.insert(
            ACCESS_TOKEN_KEY.to_string(),
            credentials.access_token().to_string(),
        );
        match credentials.refresh_token() {
            Some(refresh) => {
                entries
                    .0
                    .insert(REFRESH_TOKEN_KEY.to_string(), refresh.to_string());
            }
            None => {
                entries.0.remove(REFRESH_TOKEN_KEY);
            }
        }

        self.save(&entries).await?;
        debug!(path = %self.path.display(), "Stored credentials");
        Ok(())
    }

    async fn write_access_token(&self, access_token: SecretString) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;

        entries.0.insert(
            ACCESS_TOKEN_KEY.to_string(),
            access_token.expose_secret().clone(),
        );

        self.save(&entries).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;

        entries.0.remove(ACCESS_TOKEN_KEY);
        entries.0.remove(REFRESH_TOKEN_KEY);

        if entries.0.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::DeleteFailed {
                    message: format!("{}: {}", self.path.display(), e),
                }),
            };
        }

        self.save(&entries).await
    }
}

/// Mock credential store for testing.
#[derive(Default)]
pub struct MockCredentialStore {
    credentials: Mutex<Option<Credentials>>,
    write_history: Mutex<Vec<String>>,
    clear_count: Mutex<u32>,
    should_fail: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MockCredentialStore {
    /// Create new mock credential store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::default();
        *store.credentials.lock() = Some(credentials);
        store
    }

    /// Set storage to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock() = should_fail;
        self
    }

    /// Set writes to fail while reads keep working.
    pub fn set_fail_writes(&self, fail_writes: bool) -> &Self {
        *self.fail_writes.lock() = fail_writes;
        self
    }

    /// Access tokens written so far, in order.
    pub fn get_write_history(&self) -> Vec<String> {
        self.write_history.lock().clone()
    }

    /// Number of times `clear` was called.
    pub fn get_clear_count(&self) -> u32 {
        *self.clear_count.lock()
    }

    /// Currently stored access token.
    pub fn current_access_token(&self) -> Option<String> {
        self.credentials
            .lock()
            .as_ref()
            .map(|c| c.access_token().to_string())
    }

    fn check_error(&self) -> Result<(), StorageError> {
        if *self.should_fail.lock() {
            return Err(StorageError::ReadFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_write_error(&self) -> Result<(), StorageError> {
        self.check_error()?;
        if *self.fail_writes.lock() {
            return Err(StorageError::WriteFailed {
                message: "Mock storage write failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn read(&self) -> Result<Option<Credentials>, StorageError> {
        self.check_error()?;
        Ok(self.credentials.lock().clone())
    }

    async fn write(&self, credentials: Credentials) -> Result<(), StorageError> {
        self.check_write_error()?;
        self.write_history
            .lock()
            .push(credentials.access_token().to_string());
        *self.credentials.lock() = Some(credentials);
        Ok(())
    }

    async fn write_access_token(&self, access_token: SecretString) -> Result<(), StorageError> {
        self.check_write_error()?;
        self.write_history
            .lock()
            .push(access_token.expose_secret().clone());

        let mut guard = self.credentials.lock();
        match guard.as_mut() {
            Some(existing) => existing.access_token = access_token,
            None => {
                *guard = Some(Credentials {
                    access_token,
                    refresh_token: None,
                })
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.check_error()?;
        *self.clear_count.lock() += 1;
        *self.credentials.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> Credentials {
        Credentials::new("access-1", Some("refresh-1".to_string()))
    }

    #[tokio::test]
    async fn test_in_memory_write_read_clear() {
        let store = InMemoryCredentialStore::new();
        assert!(store.read().await.unwrap().is_none());

        store.write(test_credentials()).await.unwrap();
        let read = store.read().await.unwrap().unwrap();
        assert_eq!(read.access_token(), "access-1");
        assert_eq!(read.refresh_token(), Some("refresh-1"));

        store.clear().await.unwrap();
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_write_access_token_keeps_refresh() {
        let store = InMemoryCredentialStore::with_credentials(test_credentials());
        store
            .write_access_token(SecretString::new("access-2".to_string()))
            .await
            .unwrap();

        let read = store.read().await.unwrap().unwrap();
        assert_eq!(read.access_token(), "access-2");
        assert_eq!(read.refresh_token(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        assert!(store.read().await.unwrap().is_none());
        store.write(test_credentials()).await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        let read = reopened.read().await.unwrap().unwrap();
        assert_eq!(read.access_token(), "access-1");
        assert_eq!(read.refresh_token(), Some("refresh-1"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(ACCESS_TOKEN_KEY));
        assert!(raw.contains(REFRESH_TOKEN_KEY));
    }

    #[tokio::test]
    async fn test_file_store_rotates_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        store.write(test_credentials()).await.unwrap();
        store
            .write_access_token(SecretString::new("access-2".to_string()))
            .await
            .unwrap();

        let read = store.read().await.unwrap().unwrap();
        assert_eq!(read.access_token(), "access-2");
        assert_eq!(read.refresh_token(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_file_store_clear_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"theme":"dark","accessToken":"a","refreshToken":"r"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.clear().await.unwrap();

        assert!(store.read().await.unwrap().is_none());
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme"));
    }

    #[tokio::test]
    async fn test_file_store_clear_removes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::new(&path);
        store.write(test_credentials()).await.unwrap();
        store.clear().await.unwrap();

        assert!(!path.exists());
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_corrupted_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(
            store.read().await,
            Err(StorageError::CorruptedData { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_store_history() {
        let store = MockCredentialStore::with_credentials(test_credentials());
        store
            .write_access_token(SecretString::new("access-2".to_string()))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.get_write_history(), vec!["access-2".to_string()]);
        assert_eq!(store.get_clear_count(), 1);
        assert!(store.current_access_token().is_none());
    }

    #[tokio::test]
    async fn test_mock_store_failure() {
        let store = MockCredentialStore::new();
        store.set_should_fail(true);
        assert!(store.read().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_store_write_failure_keeps_reads() {
        let store = MockCredentialStore::with_credentials(Credentials::new("a-1", None));
        store.set_fail_writes(true);

        let result = store
            .write_access_token(SecretString::new("a-2".to_string()))
            .await;
        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
        assert_eq!(
            store.read().await.unwrap().unwrap().access_token(),
            "a-1"
        );
        assert!(store.get_write_history().is_empty());
    }
}
