//! Monitored transactions
//!
//! Logs how long a transaction waited for a connection and how long it was
//! held. A transaction dropped without commit rolls back.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

use crate::error::StoreError;

/// Held longer than this is logged at warn
const LONG_HOLD_MS: u128 = 2000;

/// Waiting longer than this for a connection is logged at warn
const SLOW_ACQUIRE_MS: u128 = 1000;

pub struct MonitoredTransaction<'c> {
    tx: Transaction<'c, Sqlite>,
    hold: HoldTimer,
}

/// Logs release timing; a drop without `finish` means rollback
struct HoldTimer {
    caller: &'static str,
    acquired_at: Instant,
    finished: bool,
}

impl HoldTimer {
    fn finish(&mut self, outcome: &'static str) {
        self.finished = true;
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > LONG_HOLD_MS {
            tracing::warn!(caller = self.caller, held_ms, outcome, "Long transaction released");
        } else {
            tracing::debug!(caller = self.caller, held_ms, outcome, "Connection released");
        }
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.finish("drop");
        }
    }
}

impl<'c> MonitoredTransaction<'c> {
    pub async fn commit(self) -> Result<(), StoreError> {
        let MonitoredTransaction { tx, mut hold } = self;
        tx.commit().await?;
        hold.finish("commit");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        let MonitoredTransaction { tx, mut hold } = self;
        tx.rollback().await?;
        hold.finish("rollback");
        Ok(())
    }

    /// Connection to run repository calls on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }
}

/// Begin a transaction with acquisition timing logs
pub async fn begin_monitored<'c>(
    pool: &'c SqlitePool,
    caller: &'static str,
) -> Result<MonitoredTransaction<'c>, StoreError> {
    let start = Instant::now();
    tracing::debug!(caller, "Connection acquisition requested");

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > SLOW_ACQUIRE_MS {
        tracing::warn!(caller, wait_ms, "Slow connection acquisition, pool may be saturated");
    } else {
        tracing::debug!(caller, wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        hold: HoldTimer {
            caller,
            acquired_at: Instant::now(),
            finished: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hits_common::db::init_database;

    #[tokio::test]
    async fn test_commit_persists() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let mut tx = begin_monitored(&pool, "test").await.unwrap();
        sqlx::query("INSERT INTO users (telegram_id) VALUES ('1')")
            .execute(tx.conn())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        {
            let mut tx = begin_monitored(&pool, "test").await.unwrap();
            sqlx::query("INSERT INTO users (telegram_id) VALUES ('1')")
                .execute(tx.conn())
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
