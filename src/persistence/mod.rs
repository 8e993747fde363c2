//! Persistence Layer
//!
//! SQLite-backed ledger for signals and robots, async via sqlx. Signals are
//! append-only history with a single terminal status update; robots carry
//! their derived performance columns. Inserts and terminal updates on the
//! signal ledger are published on a broadcast feed (see [`feed`]) so the
//! engine learns about externally inserted records in near-real-time.

pub mod feed;
pub mod models;
pub mod repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    MigrationError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

/// Initialize the connection pool and run migrations.
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("initializing database: {}", database_url);

    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("database initialized");
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signals (
            id TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            action TEXT NOT NULL CHECK(action IN ('buy', 'sell', 'close')),
            volume REAL NOT NULL,
            price REAL,
            stop_loss REAL,
            take_profit REAL,
            ticket INTEGER,
            bot_token TEXT,
            source TEXT NOT NULL CHECK(source IN ('external', 'manual')),
            status TEXT NOT NULL CHECK(status IN ('pending', 'executed', 'failed')),
            profit_loss REAL,
            account_scope TEXT NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("failed to create signals table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS robots (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            symbol TEXT,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            strategy TEXT NOT NULL,
            risk_level TEXT NOT NULL CHECK(risk_level IN ('low', 'medium', 'high')),
            max_lot_size REAL NOT NULL,
            stop_loss_pips REAL NOT NULL,
            take_profit_pips REAL NOT NULL,
            bot_token TEXT NOT NULL UNIQUE,
            account_scope TEXT NOT NULL,
            total_trades INTEGER NOT NULL DEFAULT 0,
            win_rate REAL NOT NULL DEFAULT 0.0,
            profit REAL NOT NULL DEFAULT 0.0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("failed to create robots table: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_signals_bot_token ON signals(bot_token)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_signals_scope_time ON signals(account_scope, created_at)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_robots_scope ON robots(account_scope)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("failed to create index: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_init() {
        let pool = init_database("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('signals', 'robots')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(result.0, 2);
    }
}
