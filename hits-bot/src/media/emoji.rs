//! Emoji extraction from photo captions

use unicode_segmentation::UnicodeSegmentation;

/// First emoji in `text`, grapheme-aware (keeps skin tones and ZWJ sequences)
pub fn first_emoji(text: &str) -> Option<String> {
    text.graphemes(true)
        .find(|g| is_emoji(g))
        .map(str::to_string)
}

fn is_emoji(grapheme: &str) -> bool {
    if emojis::get(grapheme).is_some() {
        return true;
    }
    // Retry without variation selectors and skin tone modifiers
    let base: String = grapheme
        .chars()
        .filter(|c| *c != '\u{fe0f}' && !('\u{1f3fb}'..='\u{1f3ff}').contains(c))
        .collect();
    !base.is_empty() && emojis::get(&base).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_emoji_found_after_text() {
        assert_eq!(first_emoji("my cat 🐱 and dog 🐶").as_deref(), Some("🐱"));
    }

    #[test]
    fn test_skin_tone_kept_together() {
        assert_eq!(first_emoji("👍🏽 nice").as_deref(), Some("👍🏽"));
    }

    #[test]
    fn test_no_emoji() {
        assert_eq!(first_emoji("just words"), None);
        assert_eq!(first_emoji(""), None);
    }
}
