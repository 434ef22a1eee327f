// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Durable Client Storage
//!
//! String-valued key-value storage for single-user state, plus a typed
//! [`Repository`] that wraps every value in a versioned envelope:
//!
//! ```json
//! {"version": 1, "data": { ... }}
//! ```
//!
//! Values written by older clients without an envelope are read as schema
//! version 0. Values that fail to decode are logged and treated as absent so
//! that callers fall back to their setup flows instead of failing.

use crate::constants::storage_keys::SCHEMA_VERSION;
use crate::logging::AppLogger;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::warn;

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Value under '{key}' uses schema version {found}, newer than supported {supported}")]
    UnsupportedVersion { key: String, found: u32, supported: u32 },

    #[error("Storage integrity check failed: {0}")]
    Integrity(String),

    #[error("Failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-value key-value store; writes overwrite, never patch
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}

/// Non-persistent store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// SQLite-backed store holding one row per key
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `database_url`
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // SQLite creates the file but not its directory
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // In-memory databases are per-connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the key-value table
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Open the store named by a storage URL
///
/// `memory` selects [`MemoryStore`]; anything else is handed to SQLite.
pub async fn open_store(database_url: &str) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    if database_url == "memory" {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(SqliteStore::new(database_url).await?))
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

/// Typed, versioned access to a [`KeyValueStore`]
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Decode a stored string, accepting enveloped and legacy values
    pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StorageError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        let is_envelope = value
            .as_object()
            .is_some_and(|obj| {
                obj.len() == 2 && obj.contains_key("version") && obj.contains_key("data")
            });

        if is_envelope {
            let envelope: Envelope = serde_json::from_value(value)?;
            if envelope.version > SCHEMA_VERSION {
                return Err(StorageError::UnsupportedVersion {
                    key: key.to_string(),
                    found: envelope.version,
                    supported: SCHEMA_VERSION,
                });
            }
            return Ok(serde_json::from_value(envelope.data)?);
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
        Ok(serde_json::to_string(&EnvelopeRef {
            version: SCHEMA_VERSION,
            data: value,
        })?)
    }

    /// Load a value; undecodable values are logged and reported as absent
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let start = Instant::now();
        let raw = self.store.get(key).await;
        AppLogger::log_storage_operation("get", key, raw.is_ok(), elapsed_ms(start));

        let Some(raw) = raw? else {
            return Ok(None);
        };

        match Self::decode(key, &raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(storage.key = %key, error = %e, "Discarding undecodable stored value");
                Ok(None)
            }
        }
    }

    /// Overwrite the value under `key`
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = Self::encode(value)?;
        let start = Instant::now();
        let result = self.store.set(key, &encoded).await;
        AppLogger::log_storage_operation("set", key, result.is_ok(), elapsed_ms(start));
        result
    }

    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.store.remove(key).await;
        AppLogger::log_storage_operation("remove", key, result.is_ok(), elapsed_ms(start));
        result
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// In-memory store whose writes can be switched to fail
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FlakyStore {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_writes
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::Integrity("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() -> Result<(), StorageError> {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await?, None);

        store.set("k", "v1").await?;
        store.set("k", "v2").await?;
        assert_eq!(store.get("k").await?, Some("v2".to_string()));

        store.remove("k").await?;
        assert_eq!(store.get("k").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_repository_writes_envelope() -> Result<(), StorageError> {
        let repo = Repository::in_memory();
        let sample = Sample { name: "walk".to_string(), count: 3 };
        repo.save("sample", &sample).await?;

        let raw = repo.store().get("sample").await?.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(value, json!({"version": 1, "data": {"name": "walk", "count": 3}}));

        assert_eq!(repo.load::<Sample>("sample").await?, Some(sample));
        Ok(())
    }

    #[tokio::test]
    async fn test_repository_reads_legacy_values_with_missing_fields() -> Result<(), StorageError> {
        let repo = Repository::in_memory();
        repo.store().set("sample", r#"{"name":"stretch"}"#).await?;

        let loaded: Option<Sample> = repo.load("sample").await?;
        assert_eq!(loaded, Some(Sample { name: "stretch".to_string(), count: 0 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_repository_treats_garbage_as_absent() -> Result<(), StorageError> {
        let repo = Repository::in_memory();
        repo.store().set("sample", "{not json").await?;
        assert_eq!(repo.load::<Sample>("sample").await?, None);

        repo.store()
            .set("sample", r#"{"version":99,"data":{"name":"future"}}"#)
            .await?;
        assert_eq!(repo.load::<Sample>("sample").await?, None);
        Ok(())
    }

    #[test]
    fn test_decode_reports_future_versions() {
        let err = Repository::decode::<Sample>("sample", r#"{"version":2,"data":{"name":"x"}}"#)
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 2, supported: 1, .. }));
    }

    #[tokio::test]
    async fn test_sqlite_store_in_memory() -> Result<(), StorageError> {
        let store = SqliteStore::new("sqlite::memory:").await?;
        store.set("userProfile", "{}").await?;
        store.set("userProfile", r#"{"a":1}"#).await?;
        assert_eq!(store.get("userProfile").await?, Some(r#"{"a":1}"#.to_string()));

        store.remove("userProfile").await?;
        assert_eq!(store.get("userProfile").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_store_creates_missing_data_directory() -> Result<(), StorageError> {
        let temp_dir = tempfile::TempDir::new()?;
        let db_path = temp_dir.path().join("bewegungsliga").join("storage.db");
        let url = format!("sqlite:{}", db_path.display());

        let store = open_store(&url).await?;
        store.set("workoutPlan", "{}").await?;

        assert!(db_path.exists());
        assert_eq!(store.backend_name(), "sqlite");
        Ok(())
    }
}
