//! Settings storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{StorageBackend, StorageTier},
};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// SQLite-backed storage tier.
///
/// Values are kept as JSON text in a single `settings` table, so the backend
/// reports [`ValueEncoding::Native`](bridge_traits::ValueEncoding::Native):
/// structured values come back exactly as written.
pub struct SqliteBackend {
    pool: SqlitePool,
    tier: StorageTier,
}

impl SqliteBackend {
    /// Open (or create) a database file for the given tier.
    pub async fn new(db_path: PathBuf, tier: StorageTier) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // SQLite URLs always use forward slashes
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path_str))
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid DB path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let backend = Self { pool, tier };
        backend.create_table().await?;

        debug!(path = ?db_path, %tier, "Initialized SQLite storage tier");
        Ok(backend)
    }

    /// Open the database at the platform data directory.
    pub async fn open_default(tier: StorageTier) -> Result<Self> {
        Self::new(Self::default_path(tier)?, tier).await
    }

    /// Platform data path for a tier, e.g. `~/.local/share/pace/primary.db`.
    pub fn default_path(tier: StorageTier) -> Result<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| BridgeError::NotAvailable("platform data directory".into()))?;
        Ok(base.join("pace").join(format!("{}.db", tier)))
    }

    /// In-memory database (for testing).
    ///
    /// Each pooled connection to `sqlite::memory:` is a separate database, so
    /// the pool is pinned to one connection.
    pub async fn in_memory(tier: StorageTier) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let backend = Self { pool, tier };
        backend.create_table().await?;
        Ok(backend)
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    fn tier(&self) -> StorageTier {
        self.tier
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::ReadFailed {
                tier: self.tier,
                message: e.to_string(),
            })?;

        match row {
            Some(row) => {
                let raw: String = row.get(0);
                match serde_json::from_str(&raw) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        // Rows written by other tools may hold bare text
                        warn!(key, error = %e, "Stored value is not JSON, returning as string");
                        Ok(Some(Value::String(raw)))
                    }
                }
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let encoded = serde_json::to_string(&value)?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(encoded)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::WriteFailed {
            tier: self.tier,
            message: e.to_string(),
        })?;

        debug!(key, tier = %self.tier, "Stored setting");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::WriteFailed {
                tier: self.tier,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings")
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::WriteFailed {
                tier: self.tier,
                message: e.to_string(),
            })?;
        debug!(tier = %self.tier, "Cleared settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_structured_values_round_trip() {
        let store = SqliteBackend::in_memory(StorageTier::Secondary).await.unwrap();

        store.set("global", json!(12.5)).await.unwrap();
        store
            .set("watch", json!([{"contentId": "a", "startTime": 1}]))
            .await
            .unwrap();
        store.set("collapsed", json!(true)).await.unwrap();

        assert_eq!(store.get("global").await.unwrap(), Some(json!(12.5)));
        assert_eq!(
            store.get("watch").await.unwrap(),
            Some(json!([{"contentId": "a", "startTime": 1}]))
        );
        assert_eq!(store.get("collapsed").await.unwrap(), Some(json!(true)));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let store = SqliteBackend::in_memory(StorageTier::Primary).await.unwrap();

        store.set("theme", json!("Dark")).await.unwrap();
        store.set("theme", json!("Ocean")).await.unwrap();
        assert_eq!(store.get("theme").await.unwrap(), Some(json!("Ocean")));

        store.remove("theme").await.unwrap();
        assert_eq!(store.get("theme").await.unwrap(), None);
        store.remove("theme").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SqliteBackend::in_memory(StorageTier::Primary).await.unwrap();
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backed_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("primary.db");

        {
            let store = SqliteBackend::new(path.clone(), StorageTier::Primary)
                .await
                .unwrap();
            store.set("global", json!(42)).await.unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteBackend::new(path, StorageTier::Primary).await.unwrap();
        assert_eq!(reopened.get("global").await.unwrap(), Some(json!(42)));
    }
}
