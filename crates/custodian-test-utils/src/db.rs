//! Database test utilities
//!
//! Provides in-memory SQLite database setup for testing.
//!
//! Note: Schema setup is done by the consuming crate since the schema
//! definition lives with the tracker implementation.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Database connection pool type alias
pub type TestDbPool = SqlitePool;

/// Create an in-memory SQLite connection pool for testing.
///
/// This creates a fresh database with no schema.
pub async fn open_test_db() -> Result<TestDbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // Single connection for in-memory to maintain state
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create an in-memory SQLite connection pool with a specific identifier.
///
/// Using the same identifier across tests allows sharing an in-memory
/// database. Different identifiers create isolated databases.
pub async fn open_named_test_db(name: &str) -> Result<TestDbPool> {
    // Use file::name?mode=memory&cache=shared for named in-memory DBs
    let uri = format!("sqlite:file:{}?mode=memory&cache=shared", name);
    let options = SqliteConnectOptions::from_str(&uri)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_test_db() {
        let pool = open_test_db().await.unwrap();

        let result: (i64,) = sqlx::query_as("SELECT 1 + 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(result.0, 2);
    }

    #[tokio::test]
    async fn test_open_named_test_db_is_shared() {
        let pool_a = open_named_test_db("custodian-shared").await.unwrap();
        let pool_b = open_named_test_db("custodian-shared").await.unwrap();

        sqlx::query("CREATE TABLE IF NOT EXISTS shared_probe (x INTEGER)")
            .execute(&pool_a)
            .await
            .unwrap();

        // Visible through the other pool because the database is shared
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='shared_probe'",
        )
        .fetch_one(&pool_b)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }
}
