//! Photo preparation
//!
//! Photos become static stickers: the largest variant is downloaded and
//! scaled so its longer side is exactly 512 px, then re-encoded as PNG.

use image::imageops::FilterType;
use image::ImageFormat;
use std::io::Cursor;

use super::hasher::HashError;
use crate::telegram::types::PhotoSize;

/// Longest side of a static sticker
pub const STICKER_MAX_SIDE: u32 = 512;

/// Variant with the most pixels
pub fn largest_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos
        .iter()
        .max_by_key(|photo| u64::from(photo.width) * u64::from(photo.height))
}

/// Scale to fit 512x512 (aspect ratio kept) and encode as PNG
pub fn resize_for_sticker(bytes: &[u8]) -> Result<Vec<u8>, HashError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| HashError::ImageDecode(e.to_string()))?;

    let resized = image.resize(STICKER_MAX_SIDE, STICKER_MAX_SIDE, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| HashError::ImageEncode(e.to_string()))?;

    Ok(out.into_inner())
}

/// [`resize_for_sticker`] on the blocking pool
pub async fn resize_for_sticker_blocking(bytes: Vec<u8>) -> Result<Vec<u8>, HashError> {
    tokio::task::spawn_blocking(move || resize_for_sticker(&bytes))
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn photo(width: u32, height: u32) -> PhotoSize {
        PhotoSize {
            file_id: format!("{}x{}", width, height),
            file_unique_id: format!("u{}x{}", width, height),
            width,
            height,
            file_size: None,
        }
    }

    #[test]
    fn test_largest_photo_by_area() {
        let photos = vec![photo(90, 60), photo(1280, 853), photo(320, 213)];
        assert_eq!(largest_photo(&photos).unwrap().file_id, "1280x853");
        assert!(largest_photo(&[]).is_none());
    }

    #[test]
    fn test_landscape_photo_scaled_down() {
        let out = resize_for_sticker(&png(1024, 512)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (512, 256));
    }

    #[test]
    fn test_small_portrait_photo_scaled_up() {
        let out = resize_for_sticker(&png(100, 200)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (256, 512));
    }
}
