//! `SQLite` implementation of [`KeyValueStore`].

use std::future::Future;

use sqlx::SqlitePool;

use castkeeper_app::ports::KeyValueStore;
use castkeeper_domain::error::CastkeeperError;

use crate::error::StorageError;

const SELECT_BY_KEY: &str = "SELECT value FROM kv_store WHERE key = ?";
const UPSERT: &str = "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// `SQLite`-backed key/value store.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, CastkeeperError>> + Send {
        let pool = self.pool.clone();
        let key = key.to_string();
        async move {
            let row: Option<(String,)> = sqlx::query_as(SELECT_BY_KEY)
                .bind(&key)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(row.map(|(value,)| value))
        }
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), CastkeeperError>> + Send {
        let pool = self.pool.clone();
        let key = key.to_string();
        let value = value.to_string();
        async move {
            sqlx::query(UPSERT)
                .bind(&key)
                .bind(&value)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            tracing::trace!(%key, %value, "stored value");
            Ok(())
        }
    }
}
