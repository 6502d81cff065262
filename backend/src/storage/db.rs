use anyhow::Result;
use async_trait::async_trait;
use sqlx::{migrate::MigrateDatabase, sqlite::SqliteRow, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use super::traits::{KeyValueStore, Versioned};

// The database URL for the production database
pub const DATABASE_URL: &str = "sqlite:brainquest.db";

/// SqliteStore keeps every entry in one `key_values` table
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize the standard database
    pub async fn init() -> Result<Self> {
        Self::new(DATABASE_URL).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS key_values (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn to_versioned(row: &SqliteRow) -> Versioned {
        Versioned {
            key: row.get("key"),
            value: row.get("value"),
            version: row.get("version"),
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        let row = sqlx::query("SELECT key, value, version FROM key_values WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.as_ref().map(Self::to_versioned))
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Versioned>> {
        // substr avoids LIKE wildcards inside user-supplied ids
        let rows = sqlx::query(
            "SELECT key, value, version FROM key_values WHERE substr(key, 1, ?) = ? ORDER BY key",
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(Self::to_versioned).collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO key_values (key, value, version) VALUES (?, ?, 1)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = key_values.version + 1
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn compare_and_swap(&self, key: &str, expected_version: Option<i64>, value: &str) -> Result<bool> {
        let result = match expected_version {
            Some(version) => {
                sqlx::query(
                    "UPDATE key_values SET value = ?, version = version + 1 WHERE key = ? AND version = ?",
                )
                .bind(value)
                .bind(key)
                .bind(version)
                .execute(self.pool())
                .await?
            }
            None => {
                sqlx::query("INSERT OR IGNORE INTO key_values (key, value, version) VALUES (?, ?, 1)")
                    .bind(key)
                    .bind(value)
                    .execute(self.pool())
                    .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM key_values WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_version(&self, key: &str, version: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM key_values WHERE key = ? AND version = ?")
            .bind(key)
            .bind(version)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
