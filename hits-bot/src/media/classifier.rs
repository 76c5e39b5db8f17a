//! Media classifier
//!
//! Decides which of the user's packs an inbound item belongs to.

use hits_common::db::StickerSetType;

use super::photo::largest_photo;
use crate::telegram::types::{Message, PhotoSize, Sticker};

/// Inbound media item: exactly one sticker or one photo
///
/// A message with neither never becomes an `IncomingMedia`, so
/// [`classify`] has no failure case.
#[derive(Debug, Clone)]
pub enum IncomingMedia {
    Sticker(Sticker),
    /// Largest resolution variant of the photo
    Photo(PhotoSize),
}

impl IncomingMedia {
    /// Extract the media item; a sticker wins over a photo
    pub fn from_message(message: &Message) -> Option<Self> {
        if let Some(sticker) = &message.sticker {
            return Some(IncomingMedia::Sticker(sticker.clone()));
        }
        message
            .photo
            .as_deref()
            .and_then(largest_photo)
            .map(|photo| IncomingMedia::Photo(photo.clone()))
    }

    pub fn file_id(&self) -> &str {
        match self {
            IncomingMedia::Sticker(sticker) => &sticker.file_id,
            IncomingMedia::Photo(photo) => &photo.file_id,
        }
    }

    pub fn file_unique_id(&self) -> &str {
        match self {
            IncomingMedia::Sticker(sticker) => &sticker.file_unique_id,
            IncomingMedia::Photo(photo) => &photo.file_unique_id,
        }
    }

    /// Pack the item was forwarded from; photos have none
    pub fn origin_set_name(&self) -> Option<&str> {
        match self {
            IncomingMedia::Sticker(sticker) => sticker.set_name.as_deref(),
            IncomingMedia::Photo(_) => None,
        }
    }
}

/// Category of a media item
pub fn classify(media: &IncomingMedia) -> StickerSetType {
    match media {
        IncomingMedia::Sticker(sticker) if sticker.is_animated => StickerSetType::Animated,
        IncomingMedia::Sticker(sticker) if sticker.is_video => StickerSetType::Video,
        IncomingMedia::Sticker(_) => StickerSetType::Regular,
        IncomingMedia::Photo(_) => StickerSetType::Regular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::types::Chat;

    fn sticker(is_animated: bool, is_video: bool) -> Sticker {
        Sticker {
            file_id: "file".to_string(),
            file_unique_id: "unique".to_string(),
            width: 512,
            height: 512,
            is_animated,
            is_video,
            emoji: Some("😀".to_string()),
            set_name: Some("pack_by_bot".to_string()),
            thumbnail: None,
        }
    }

    fn photo(file_id: &str, width: u32, height: u32) -> PhotoSize {
        PhotoSize {
            file_id: file_id.to_string(),
            file_unique_id: format!("{}-unique", file_id),
            width,
            height,
            file_size: None,
        }
    }

    fn message() -> Message {
        Message {
            message_id: 1,
            chat: Chat { id: 1 },
            from: None,
            text: None,
            caption: None,
            sticker: None,
            photo: None,
        }
    }

    #[test]
    fn test_sticker_flags_pick_category() {
        assert_eq!(
            classify(&IncomingMedia::Sticker(sticker(true, false))),
            StickerSetType::Animated
        );
        assert_eq!(
            classify(&IncomingMedia::Sticker(sticker(false, true))),
            StickerSetType::Video
        );
        assert_eq!(
            classify(&IncomingMedia::Sticker(sticker(false, false))),
            StickerSetType::Regular
        );
    }

    #[test]
    fn test_photo_is_always_regular() {
        let mut msg = message();
        msg.photo = Some(vec![photo("small", 90, 90), photo("big", 1280, 960)]);
        let media = IncomingMedia::from_message(&msg).unwrap();
        assert_eq!(classify(&media), StickerSetType::Regular);
        assert_eq!(media.file_id(), "big");
        assert_eq!(media.origin_set_name(), None);
    }

    #[test]
    fn test_text_message_has_no_media() {
        let mut msg = message();
        msg.text = Some("hello".to_string());
        assert!(IncomingMedia::from_message(&msg).is_none());

        msg.photo = Some(Vec::new());
        assert!(IncomingMedia::from_message(&msg).is_none());
    }

    #[test]
    fn test_sticker_carries_origin_pack() {
        let media = IncomingMedia::Sticker(sticker(false, false));
        assert_eq!(media.origin_set_name(), Some("pack_by_bot"));
        assert_eq!(media.file_unique_id(), "unique");
    }
}
