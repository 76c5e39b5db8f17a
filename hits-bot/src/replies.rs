//! User-facing reply texts (HTML parse mode)

use hits_common::db::StickerSet;

pub const GENERIC_FAILURE: &str = "An error occurred. Please try again.";
pub const NO_USERNAME: &str = "Please set a username to use this bot.";
pub const NOT_MEDIA: &str = "Send me a sticker or a photo and I'll put it into your pack.";
pub const STICKER_WITHOUT_EMOJI: &str =
    "This sticker has no emoji attached, so I can't add it to your pack.";
pub const MISSING_CAPTION: &str = "Please add a caption with an emoji to your picture (e.g. 🥰)";
pub const CAPTION_WITHOUT_EMOJI: &str = "Your caption does not contain an emoji 🥲";
pub const IMAGE_UNREADABLE: &str = "I couldn't read that image. Please try again.";
pub const STICKER_REMOVED: &str =
    "Sticker removed from the pack. It may take a few minutes for sticker pack to update.";
pub const LAST_STICKER_KEPT: &str = "You can't remove the last sticker from your pack.";
pub const ALREADY_IN_PACK: &str = "This sticker is already in your pack.";

/// Public link to a pack
pub fn pack_url(set_name: &str) -> String {
    format!("https://t.me/addstickers/{}", set_name)
}

fn pack_link(set: &StickerSet) -> String {
    format!(
        "<a href='{}'>{}</a>",
        pack_url(&set.name),
        escape_html(&set.title)
    )
}

pub fn greeting(full_name: &str) -> String {
    format!(
        "Hello, <b>{}!</b>\n\nSend me a sticker or a photo with an emoji caption \
         and I'll add it to your personal pack. Send a sticker from your pack \
         again to remove it.",
        escape_html(full_name)
    )
}

pub fn pack_created(set: &StickerSet) -> String {
    format!("Sticker pack created!\n\nLink: {}", pack_link(set))
}

pub fn sticker_added(set: &StickerSet) -> String {
    format!("Sticker added to the pack.\n\nLink: {}", pack_link(set))
}

pub fn removal_not_modified(admin_contact_url: &str) -> String {
    format!(
        "It seems like you tried to remove a sticker from the pack, \
         but it wasn't in the pack due to a bug in Telegram, most likely. \
         Please wait 15 minutes and check if sticker is in your pack still.\n\
         If it is, please contact me!\n\n\
         <a href='{}'>Contact</a>",
        admin_contact_url
    )
}

/// Escape text placed inside HTML replies
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
