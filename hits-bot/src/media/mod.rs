//! Media handling: classification, fingerprinting, photo preparation, emoji

pub mod classifier;
pub mod emoji;
pub mod hasher;
pub mod photo;

pub use classifier::{classify, IncomingMedia};
pub use hasher::{HashError, ImageHash};
