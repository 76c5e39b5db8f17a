//! User registry

use hits_common::db::User;
use sqlx::SqliteConnection;

use crate::error::StoreError;

/// Fetch the user for `telegram_id`, inserting it on first contact
pub async fn get_or_create(
    conn: &mut SqliteConnection,
    telegram_id: &str,
) -> Result<User, StoreError> {
    // No-op update so RETURNING yields the existing row on conflict
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (telegram_id)
        VALUES (?)
        ON CONFLICT(telegram_id) DO UPDATE SET telegram_id = excluded.telegram_id
        RETURNING id, created_at, telegram_id
        "#,
    )
    .bind(telegram_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(user)
}

pub async fn find_by_telegram_id(
    conn: &mut SqliteConnection,
    telegram_id: &str,
) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, created_at, telegram_id FROM users WHERE telegram_id = ?",
    )
    .bind(telegram_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hits_common::db::init_database;

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create(&mut conn, "42").await.unwrap();
        let second = get_or_create(&mut conn, "42").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.telegram_id, "42");

        let other = get_or_create(&mut conn, "43").await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_unknown_user_is_absent() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert!(find_by_telegram_id(&mut conn, "7").await.unwrap().is_none());
        get_or_create(&mut conn, "7").await.unwrap();
        assert!(find_by_telegram_id(&mut conn, "7").await.unwrap().is_some());
    }
}
