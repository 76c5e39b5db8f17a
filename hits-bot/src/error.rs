//! Error types for hits-bot
//!
//! Every failure maps to exactly one reply policy:
//! - user-input errors: short, specific reply
//! - transport / image errors: generic "try again" reply
//! - locked database: retried by the caller before surfacing
//! - missing sender: silently logged, no reply

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::media::HashError;
use crate::replies;
use crate::telegram::TransportError;

/// Problems with what the user sent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserInputError {
    #[error("sender has no username")]
    NoUsername,

    #[error("message is neither a sticker nor a photo")]
    NotMedia,

    #[error("sticker has no emoji")]
    StickerWithoutEmoji,

    #[error("photo has no caption")]
    MissingCaption,

    #[error("caption contains no emoji")]
    CaptionWithoutEmoji,
}

impl UserInputError {
    pub fn reply_text(&self) -> &'static str {
        match self {
            UserInputError::NoUsername => replies::NO_USERNAME,
            UserInputError::NotMedia => replies::NOT_MEDIA,
            UserInputError::StickerWithoutEmoji => replies::STICKER_WITHOUT_EMOJI,
            UserInputError::MissingCaption => replies::MISSING_CAPTION,
            UserInputError::CaptionWithoutEmoji => replies::CAPTION_WITHOUT_EMOJI,
        }
    }
}

/// Storage errors, classified from SQLite messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Pack name collided with an existing row
    #[error("Sticker set name already taken")]
    DuplicateSetName,

    /// Another writer created the (user, category) set first
    #[error("Sticker set already exists for this user and category")]
    SetAlreadyExists,

    /// Another writer stored the same unique id in the set first
    #[error("Sticker already stored in this set")]
    DuplicateSticker,

    #[error("Database is locked")]
    Locked,

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Running the same transaction again may succeed
    ///
    /// Only a locked database qualifies. Constraint violations mean another
    /// process wrote the row, and repeating the insert cannot fix that.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Locked)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let message = db_err.message();
            if db_err.is_unique_violation() {
                if message.contains("sticker_sets.name") {
                    return StoreError::DuplicateSetName;
                }
                if message.contains("sticker_sets.user_id") {
                    return StoreError::SetAlreadyExists;
                }
                if message.contains("stickers.sticker_set_id") {
                    return StoreError::DuplicateSticker;
                }
            }
            if message.contains("database is locked")
                || message.contains("database table is locked")
            {
                return StoreError::Locked;
            }
        }
        StoreError::Database(err)
    }
}

/// Errors raised while handling one inbound event
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Message has no sender")]
    NoSender,

    #[error("User input: {0}")]
    UserInput(#[from] UserInputError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Image error: {0}")]
    ImageDecode(#[from] HashError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Handler timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        BotError::Storage(StoreError::from(err))
    }
}

impl BotError {
    /// Reply owed to the user; `None` for events nobody can be answered for
    pub fn reply_text(&self) -> Option<String> {
        match self {
            BotError::NoSender => None,
            BotError::UserInput(err) => Some(err.reply_text().to_string()),
            BotError::ImageDecode(HashError::ImageDecode(_)) => {
                Some(replies::IMAGE_UNREADABLE.to_string())
            }
            _ => Some(replies::GENERIC_FAILURE.to_string()),
        }
    }

    /// Expected outcomes are logged below error level
    pub fn is_user_facing(&self) -> bool {
        matches!(self, BotError::NoSender | BotError::UserInput(_))
    }
}

/// HTTP error for the webhook surface
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sender_gets_no_reply() {
        assert_eq!(BotError::NoSender.reply_text(), None);
    }

    #[test]
    fn test_user_input_gets_specific_reply() {
        let err = BotError::from(UserInputError::NoUsername);
        assert_eq!(err.reply_text().as_deref(), Some(replies::NO_USERNAME));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_transport_failure_gets_generic_reply() {
        let err = BotError::from(TransportError::Network("connection reset".to_string()));
        assert_eq!(err.reply_text().as_deref(), Some(replies::GENERIC_FAILURE));
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_decode_failure_asks_to_retry() {
        let err = BotError::from(HashError::ImageDecode("bad header".to_string()));
        assert_eq!(err.reply_text().as_deref(), Some(replies::IMAGE_UNREADABLE));
    }

    #[test]
    fn test_non_database_sqlx_error_is_not_retryable() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_retryable());
    }
}
