//! Inbound filtering chain
//!
//! Turns a raw [`Message`] into a typed [`Inbound`] value, one stage at a
//! time. Each stage either narrows the type or rejects the message with the
//! error whose reply the user should see.

use hits_common::db::StickerSetType;

use crate::error::{BotError, UserInputError};
use crate::media::emoji::first_emoji;
use crate::media::{classify, IncomingMedia};
use crate::telegram::types::Message;

/// Where the reply to an event goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub message_id: i64,
}

impl ReplyTarget {
    pub fn of(message: &Message) -> Self {
        Self {
            chat_id: message.chat.id,
            message_id: message.message_id,
        }
    }
}

/// Sender that passed the username check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

/// A media item ready for reconciliation
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub sender: Sender,
    pub media: IncomingMedia,
    pub category: StickerSetType,
    /// Emoji attached to the new pack item
    pub emoji: String,
}

#[derive(Debug, Clone)]
pub enum Inbound {
    Start(Sender),
    Media(MediaRequest),
}

/// Run the full chain
pub fn parse(message: &Message) -> Result<Inbound, BotError> {
    let sender = sender(message)?;

    if message.is_start_command() {
        return Ok(Inbound::Start(sender));
    }

    let media = media(message)?;
    let emoji = emoji(message, &media)?;
    let category = classify(&media);

    Ok(Inbound::Media(MediaRequest {
        sender,
        media,
        category,
        emoji,
    }))
}

/// No sender: nobody to answer. No username: cannot name a pack.
pub fn sender(message: &Message) -> Result<Sender, BotError> {
    let from = message.from.as_ref().ok_or(BotError::NoSender)?;

    let username = from
        .username
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(UserInputError::NoUsername)?;

    Ok(Sender {
        id: from.id,
        username: username.to_string(),
        full_name: from.full_name(),
    })
}

pub fn media(message: &Message) -> Result<IncomingMedia, UserInputError> {
    IncomingMedia::from_message(message).ok_or(UserInputError::NotMedia)
}

/// Sticker: its own emoji. Photo: first emoji of the caption.
pub fn emoji(message: &Message, media: &IncomingMedia) -> Result<String, UserInputError> {
    match media {
        IncomingMedia::Sticker(sticker) => sticker
            .emoji
            .clone()
            .filter(|emoji| !emoji.is_empty())
            .ok_or(UserInputError::StickerWithoutEmoji),
        IncomingMedia::Photo(_) => {
            let caption = message
                .caption
                .as_deref()
                .filter(|caption| !caption.trim().is_empty())
                .ok_or(UserInputError::MissingCaption)?;
            first_emoji(caption).ok_or(UserInputError::CaptionWithoutEmoji)
        }
    }
}
