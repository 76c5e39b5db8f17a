//! Transport trait
//!
//! Everything the bot needs from the messaging platform goes through
//! [`Transport`], so the reconciliation logic can run against a fake in tests.

use async_trait::async_trait;
use hits_common::db::StickerSetType;
use thiserror::Error;

use super::types::{File, User};

/// Marker the platform returns when a pack mutation changed nothing
const NOT_MODIFIED_MARKER: &str = "STICKERSET_NOT_MODIFIED";

/// Description the platform returns when a pack name belongs to another pack
const NAME_OCCUPIED_MARKER: &str = "name is already occupied";

/// Transport errors
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("File {0} has no download path")]
    MissingFilePath(String),
}

impl TransportError {
    /// The pack was already in the requested state
    pub fn is_not_modified(&self) -> bool {
        matches!(self, TransportError::Api { description, .. } if description.contains(NOT_MODIFIED_MARKER))
    }

    /// Pack creation was refused because the name is taken
    pub fn is_name_occupied(&self) -> bool {
        matches!(self, TransportError::Api { code: 400, description } if description.contains(NAME_OCCUPIED_MARKER))
    }

    /// Worth retrying for idempotent reads
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// Media format of a pack item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerFormat {
    /// PNG/WEBP image
    Static,
    /// TGS (gzipped Lottie)
    Animated,
    /// WEBM video
    Video,
}

impl StickerFormat {
    pub fn for_category(category: StickerSetType) -> Self {
        match category {
            StickerSetType::Regular => StickerFormat::Static,
            StickerSetType::Animated => StickerFormat::Animated,
            StickerSetType::Video => StickerFormat::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StickerFormat::Static => "static",
            StickerFormat::Animated => "animated",
            StickerFormat::Video => "video",
        }
    }

    /// File name used when the item is uploaded rather than referenced
    pub fn upload_file_name(&self) -> &'static str {
        match self {
            StickerFormat::Static => "sticker.png",
            StickerFormat::Animated => "sticker.tgs",
            StickerFormat::Video => "sticker.webm",
        }
    }
}

/// Where the platform gets the item's content from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickerSource {
    /// A file already stored on the platform
    FileId(String),
    /// Bytes sent along with the request
    Upload { file_name: String, bytes: Vec<u8> },
}

/// Media attached to a create/add pack call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub format: StickerFormat,
    pub source: StickerSource,
}

impl MediaAttachment {
    pub fn file_id(format: StickerFormat, file_id: impl Into<String>) -> Self {
        Self {
            format,
            source: StickerSource::FileId(file_id.into()),
        }
    }

    pub fn upload(format: StickerFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            source: StickerSource::Upload {
                file_name: format.upload_file_name().to_string(),
                bytes,
            },
        }
    }
}

/// Operations consumed from the messaging platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot's own account
    async fn get_me(&self) -> Result<User, TransportError>;

    /// Reply to a message with HTML text
    async fn reply(
        &self,
        chat_id: i64,
        reply_to_message_id: i64,
        html: &str,
    ) -> Result<(), TransportError>;

    /// File metadata (download path)
    async fn get_file(&self, file_id: &str) -> Result<File, TransportError>;

    /// Durable URL for a file path returned by [`Transport::get_file`]
    fn file_url(&self, file_path: &str) -> String;

    /// Fetch raw bytes from a file URL
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    async fn create_sticker_set(
        &self,
        user_id: i64,
        name: &str,
        title: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError>;

    async fn add_sticker_to_set(
        &self,
        user_id: i64,
        name: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError>;

    async fn delete_sticker_from_set(&self, sticker_file_id: &str) -> Result<(), TransportError>;
}
