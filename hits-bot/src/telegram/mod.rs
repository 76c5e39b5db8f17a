//! Message transport: Bot API client and the seam the bot logic talks to

pub mod client;
pub mod transport;
pub mod types;

pub use client::TelegramClient;
pub use transport::{MediaAttachment, StickerFormat, StickerSource, Transport, TransportError};
