//! Pack mutator
//!
//! Wraps the platform's pack operations. Picks the attachment form per
//! category: regular stickers by file id, photos as resized PNG uploads,
//! animated and video items as uploads of the downloaded original.
//!
//! File lookups and downloads are idempotent reads and get bounded retries.
//! Create/add/delete calls are never retried.

use hits_common::db::{StickerSet, StickerSetType};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::BotError;
use crate::media::photo::resize_for_sticker_blocking;
use crate::media::IncomingMedia;
use crate::telegram::{MediaAttachment, StickerFormat, Transport, TransportError};
use crate::utils::retry_idempotent;

/// Attempts for one file lookup or download
const READ_ATTEMPTS: u32 = 3;

/// Result of a platform-side removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// The platform reported nothing to remove
    NotModified,
}

pub struct PackMutator {
    transport: Arc<dyn Transport>,
    bot_username: OnceCell<String>,
}

impl PackMutator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            bot_username: OnceCell::new(),
        }
    }

    /// The bot's own username, fetched once per process
    pub async fn bot_username(&self) -> Result<&str, BotError> {
        let username = self
            .bot_username
            .get_or_try_init(|| async {
                let me = self.transport.get_me().await?;
                me.username
                    .ok_or_else(|| BotError::Internal("bot account has no username".to_string()))
            })
            .await?;
        Ok(username.as_str())
    }

    /// Resolve a file id to its bytes (metadata lookup, then download)
    pub async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let file = retry_idempotent(
            "get_file",
            READ_ATTEMPTS,
            TransportError::is_transient,
            || self.transport.get_file(file_id),
        )
        .await?;

        let path = file
            .file_path
            .ok_or_else(|| TransportError::MissingFilePath(file_id.to_string()))?;
        let url = self.transport.file_url(&path);

        retry_idempotent(
            "download_file",
            READ_ATTEMPTS,
            TransportError::is_transient,
            || self.transport.download(&url),
        )
        .await
    }

    /// Build the attachment for a create/add call
    ///
    /// `raw_file` holds the item's own bytes when they were already
    /// downloaded for fingerprinting.
    pub async fn prepare_attachment(
        &self,
        media: &IncomingMedia,
        category: StickerSetType,
        raw_file: Option<Vec<u8>>,
    ) -> Result<MediaAttachment, BotError> {
        let format = StickerFormat::for_category(category);

        let attachment = match (media, category) {
            (IncomingMedia::Sticker(sticker), StickerSetType::Regular) => {
                MediaAttachment::file_id(format, sticker.file_id.clone())
            }
            (IncomingMedia::Photo(photo), _) => {
                let bytes = match raw_file {
                    Some(bytes) => bytes,
                    None => self.fetch_file(&photo.file_id).await?,
                };
                let png = resize_for_sticker_blocking(bytes).await?;
                MediaAttachment::upload(format, png)
            }
            (IncomingMedia::Sticker(sticker), _) => {
                let bytes = match raw_file {
                    Some(bytes) => bytes,
                    None => self.fetch_file(&sticker.file_id).await?,
                };
                MediaAttachment::upload(format, bytes)
            }
        };

        tracing::debug!(
            category = %category,
            format = format.as_str(),
            "Attachment prepared"
        );

        Ok(attachment)
    }

    pub async fn create_pack(
        &self,
        user_id: i64,
        name: &str,
        title: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        self.transport
            .create_sticker_set(user_id, name, title, emoji, attachment)
            .await
    }

    pub async fn add_to_pack(
        &self,
        user_id: i64,
        set: &StickerSet,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        self.transport
            .add_sticker_to_set(user_id, &set.name, emoji, attachment)
            .await
    }

    /// Delete a pack item; "not modified" is reported, not raised
    pub async fn remove_from_pack(&self, sticker_file_id: &str) -> Result<Removal, TransportError> {
        match self.transport.delete_sticker_from_set(sticker_file_id).await {
            Ok(()) => Ok(Removal::Removed),
            Err(err) if err.is_not_modified() => {
                tracing::info!(error = %err, "Pack unchanged by removal");
                Ok(Removal::NotModified)
            }
            Err(err) => Err(err),
        }
    }
}
