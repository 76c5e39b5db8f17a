//! Database initialization
//!
//! Opens (or creates) the SQLite store and creates the schema idempotently.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long a connection waits on a locked database before erroring
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open the database at `database_url`, creating file and tables if needed
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    // An in-memory database lives and dies with its connection
    let in_memory = database_url.contains(":memory:");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(10).min_connections(1)
    };

    let pool = pool_options.connect_with(options).await?;

    create_tables(&pool).await?;

    info!(in_memory, "Database ready");

    Ok(pool)
}

/// Create all tables and indexes (safe to call repeatedly)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_sticker_sets_table(pool).await?;
    create_stickers_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            telegram_id TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sticker_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sticker_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            set_type TEXT NOT NULL CHECK (set_type IN ('REGULAR', 'ANIMATED', 'VIDEO')),
            UNIQUE (user_id, set_type)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_stickers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stickers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            file_id TEXT NOT NULL,
            file_unique_id TEXT NOT NULL,
            image_hash TEXT NOT NULL,
            sticker_set_id INTEGER NOT NULL REFERENCES sticker_sets(id) ON DELETE CASCADE,
            UNIQUE (sticker_set_id, file_unique_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stickers_set_hash ON stickers(sticker_set_id, image_hash)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
