//! Opening the `SQLite` database that backs device memory.
//!
//! File databases are created on first start and run in WAL mode. An
//! in-memory database lives only as long as its single connection.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StorageError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_FILE_CONNECTIONS: u32 = 4;

/// Where the key/value store lives.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:castkeeper.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Open the database and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is invalid, the connection fails
    /// or a migration fails.
    pub async fn build(self) -> Result<Database, StorageError> {
        let pool = self
            .pool_options()
            .connect_with(self.connect_options()?)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::debug!(
            database_url = %self.database_url,
            in_memory = self.is_in_memory(),
            "key/value store ready"
        );
        Ok(Database { pool })
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, StorageError> {
        let options = SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        if self.is_in_memory() {
            return Ok(options);
        }
        Ok(options.journal_mode(SqliteJournalMode::Wal))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        if self.is_in_memory() {
            // Every connection to `:memory:` opens its own empty database.
            return SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        SqlitePoolOptions::new().max_connections(MAX_FILE_CONNECTIONS)
    }
}

/// An open, migrated database.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
