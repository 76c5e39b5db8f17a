//! Row types for the users / sticker_sets / stickers tables
//!
//! Ownership: a user owns at most one sticker set per category, a sticker
//! set owns its stickers (rows are cascade-deleted with the set).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Sticker set category
///
/// Mutually exclusive; decides which pack and attachment format apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StickerSetType {
    Regular,
    Animated,
    Video,
}

impl StickerSetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StickerSetType::Regular => "REGULAR",
            StickerSetType::Animated => "ANIMATED",
            StickerSetType::Video => "VIDEO",
        }
    }
}

impl fmt::Display for StickerSetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StickerSetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULAR" => Ok(StickerSetType::Regular),
            "ANIMATED" => Ok(StickerSetType::Animated),
            "VIDEO" => Ok(StickerSetType::Video),
            other => Err(Error::InvalidInput(format!(
                "Unknown sticker set type: {}",
                other
            ))),
        }
    }
}

/// One platform identity that has talked to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    /// Platform user id, stored as text
    pub telegram_id: String,
}

/// One personal pack, owned by one user, scoped to one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerSet {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    /// External pack name, globally unique on the platform
    pub name: String,
    pub title: String,
    pub set_type: StickerSetType,
}

/// One media item placed into a sticker set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub file_id: String,
    /// Stable across re-uploads of the same content
    pub file_unique_id: String,
    /// Perceptual hash, hex encoded
    pub image_hash: String,
    pub sticker_set_id: i64,
}

fn created_at(row: &SqliteRow) -> sqlx::Result<DateTime<Utc>> {
    let naive: NaiveDateTime = row.try_get("created_at")?;
    Ok(naive.and_utc())
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: created_at(row)?,
            telegram_id: row.try_get("telegram_id")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for StickerSet {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let set_type: String = row.try_get("set_type")?;
        let set_type = set_type
            .parse::<StickerSetType>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "set_type".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            created_at: created_at(row)?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            title: row.try_get("title")?,
            set_type,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Sticker {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: created_at(row)?,
            file_id: row.try_get("file_id")?,
            file_unique_id: row.try_get("file_unique_id")?,
            image_hash: row.try_get("image_hash")?,
            sticker_set_id: row.try_get("sticker_set_id")?,
        })
    }
}
