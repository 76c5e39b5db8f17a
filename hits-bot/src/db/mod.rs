//! Repositories over the users / sticker_sets / stickers tables
//!
//! Every function takes a `&mut SqliteConnection` so callers decide the
//! unit of work; the reconciler passes its per-event transaction.

pub mod sticker_sets;
pub mod stickers;
pub mod users;
