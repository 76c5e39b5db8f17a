//! Perceptual hasher
//!
//! 8x8 average hash: grayscale, downscale to 8x8, one bit per pixel set when
//! the pixel is brighter than the mean. Bits are laid out row-major, first
//! pixel in the most significant bit, and rendered as 16 hex digits.
//!
//! Equal hashes mean "probably the same picture", nothing stronger. Re-encodes
//! usually hash identically; distinct images can collide.

use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Side length of the downscaled image
pub const HASH_SIZE: u32 = 8;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Image encode error: {0}")]
    ImageEncode(String),

    #[error("Hash task failed: {0}")]
    Task(String),
}

/// 64-bit image fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(u64);

impl fmt::Display for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Average hash of encoded image bytes (PNG, JPEG, WEBP, ...)
pub fn average_hash(bytes: &[u8]) -> Result<ImageHash, HashError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| HashError::ImageDecode(e.to_string()))?;

    let small = image
        .grayscale()
        .resize_exact(HASH_SIZE, HASH_SIZE, FilterType::Lanczos3)
        .to_luma8();

    let pixels: Vec<u8> = small.pixels().map(|p| p.0[0]).collect();
    let mean = pixels.iter().map(|&p| f64::from(p)).sum::<f64>() / pixels.len() as f64;

    let bits = pixels
        .iter()
        .fold(0u64, |acc, &p| (acc << 1) | u64::from(f64::from(p) > mean));

    Ok(ImageHash(bits))
}

/// [`average_hash`] on the blocking pool
pub async fn average_hash_blocking(bytes: Vec<u8>) -> Result<ImageHash, HashError> {
    tokio::task::spawn_blocking(move || average_hash(&bytes))
        .await
        .map_err(|e| HashError::Task(e.to_string()))?
}

/// Exact-content fingerprint for media the decoder cannot read
///
/// First 8 bytes of the SHA-256 digest.
pub fn content_digest(bytes: &[u8]) -> ImageHash {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    ImageHash(u64::from_be_bytes(head))
}
