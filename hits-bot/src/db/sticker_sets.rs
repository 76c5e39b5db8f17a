//! Sticker-set repository

use hits_common::db::{StickerSet, StickerSetType};
use sqlx::SqliteConnection;

use crate::error::StoreError;

/// The user's set for `category`, if one exists
pub async fn find_by_user_and_category(
    conn: &mut SqliteConnection,
    user_id: i64,
    category: StickerSetType,
) -> Result<Option<StickerSet>, StoreError> {
    let set = sqlx::query_as::<_, StickerSet>(
        r#"
        SELECT id, created_at, user_id, name, title, set_type
        FROM sticker_sets
        WHERE user_id = ? AND set_type = ?
        "#,
    )
    .bind(user_id)
    .bind(category.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(set)
}

/// Insert a new set
///
/// Fails with [`StoreError::DuplicateSetName`] when `name` is taken and with
/// [`StoreError::SetAlreadyExists`] when the user already owns a set of
/// this category.
pub async fn create(
    conn: &mut SqliteConnection,
    user_id: i64,
    category: StickerSetType,
    name: &str,
    title: &str,
) -> Result<StickerSet, StoreError> {
    let set = sqlx::query_as::<_, StickerSet>(
        r#"
        INSERT INTO sticker_sets (user_id, name, title, set_type)
        VALUES (?, ?, ?, ?)
        RETURNING id, created_at, user_id, name, title, set_type
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(title)
    .bind(category.as_str())
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        user_id,
        set_name = %set.name,
        category = %category,
        "Sticker set row inserted"
    );

    Ok(set)
}
