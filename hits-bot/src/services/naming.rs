//! Pack names and titles

use hits_common::db::StickerSetType;
use rand::Rng;

/// Platform limit on pack name length
pub const MAX_PACK_NAME_LEN: usize = 64;

const SUFFIX_LEN: usize = 4;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `{username}_{4 random letters}_by_{bot_username}`
///
/// The username part is shortened when the whole name would exceed
/// [`MAX_PACK_NAME_LEN`].
pub fn pack_name(username: &str, bot_username: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(LETTERS[rng.gen_range(0..LETTERS.len())]))
        .collect();
    pack_name_with_suffix(username, &suffix, bot_username)
}

fn pack_name_with_suffix(username: &str, suffix: &str, bot_username: &str) -> String {
    let fixed = 1 + suffix.len() + "_by_".len() + bot_username.len();
    let room = MAX_PACK_NAME_LEN.saturating_sub(fixed).max(1);
    let user_part: String = username
        .trim_end_matches('_')
        .chars()
        .take(room)
        .collect();
    let user_part = user_part.trim_end_matches('_');

    format!("{}_{}_by_{}", user_part, suffix, bot_username)
}

pub fn pack_title(username: &str, category: StickerSetType) -> String {
    let kind = match category {
        StickerSetType::Regular => "",
        StickerSetType::Animated => "Animated ",
        StickerSetType::Video => "Video ",
    };
    format!("{}'s Greatest {}Hits", username, kind)
}
