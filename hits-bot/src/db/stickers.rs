//! Sticker repository
//!
//! Lookups are always scoped to one set. Deletion targets a single row by
//! primary key; the caller resolves that row with
//! [`find_by_unique_id_or_hash`] first.

use hits_common::db::Sticker;
use sqlx::SqliteConnection;

use crate::error::StoreError;

const STICKER_COLUMNS: &str =
    "id, created_at, file_id, file_unique_id, image_hash, sticker_set_id";

/// Two-phase lookup: exact unique id first, then perceptual hash
///
/// Re-uploads of the same content keep their unique id; the same picture
/// arriving as a photo and as a sticker shares only the hash.
pub async fn find_by_unique_id_or_hash(
    conn: &mut SqliteConnection,
    set_id: i64,
    file_unique_id: &str,
    image_hash: &str,
) -> Result<Option<Sticker>, StoreError> {
    let by_unique_id = sqlx::query_as::<_, Sticker>(&format!(
        "SELECT {} FROM stickers WHERE sticker_set_id = ? AND file_unique_id = ? LIMIT 1",
        STICKER_COLUMNS
    ))
    .bind(set_id)
    .bind(file_unique_id)
    .fetch_optional(&mut *conn)
    .await?;

    if by_unique_id.is_some() {
        return Ok(by_unique_id);
    }

    let by_hash = sqlx::query_as::<_, Sticker>(&format!(
        "SELECT {} FROM stickers WHERE sticker_set_id = ? AND image_hash = ? ORDER BY id LIMIT 1",
        STICKER_COLUMNS
    ))
    .bind(set_id)
    .bind(image_hash)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(by_hash)
}

/// Insert a sticker row; duplicates are the caller's concern
pub async fn save(
    conn: &mut SqliteConnection,
    set_id: i64,
    file_id: &str,
    file_unique_id: &str,
    image_hash: &str,
) -> Result<Sticker, StoreError> {
    let sticker = sqlx::query_as::<_, Sticker>(&format!(
        r#"
        INSERT INTO stickers (file_id, file_unique_id, image_hash, sticker_set_id)
        VALUES (?, ?, ?, ?)
        RETURNING {}
        "#,
        STICKER_COLUMNS
    ))
    .bind(file_id)
    .bind(file_unique_id)
    .bind(image_hash)
    .bind(set_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(sticker)
}

/// Delete exactly one row; returns whether it existed
pub async fn remove_by_id(conn: &mut SqliteConnection, sticker_id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM stickers WHERE id = ?")
        .bind(sticker_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_in_set(conn: &mut SqliteConnection, set_id: i64) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stickers WHERE sticker_set_id = ?")
        .bind(set_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}
