//! Reconciliation engine
//!
//! Given a user's media item, decides between creating the category's pack,
//! adding to it, removing from it, or doing nothing, and applies the
//! decision to both the store and the platform.
//!
//! Per event:
//! 1. fingerprint the item (downloads happen here)
//! 2. take the sender's lock so their events apply one at a time
//! 3. read user / set / matching sticker in a read-only transaction
//! 4. [`decide`]
//! 5. call the platform
//! 6. write the row changes in a short transaction of their own
//!
//! No transaction is open while the platform is being called, so one slow
//! pack call never holds the database's write lock against other users.
//! A locked database in steps 3 or 6 is retried with backoff. The platform
//! call itself is never repeated.

use hits_common::db::{Sticker, StickerSet, StickerSetType, User};
use hits_common::RemovalPolicy;
use sqlx::SqlitePool;
use std::sync::Arc;

use super::naming;
use super::pack_mutator::{PackMutator, Removal};
use super::pipeline::MediaRequest;
use crate::db::{sticker_sets, stickers, users};
use crate::error::{BotError, StoreError};
use crate::media::hasher::{average_hash_blocking, content_digest};
use crate::media::{ImageHash, IncomingMedia};
use crate::replies;
use crate::telegram::{MediaAttachment, Transport};
use crate::utils::{begin_monitored, retry_idempotent, KeyedLocks};

/// Attempts at one store read or write while the database is locked
const MAX_STORE_ATTEMPTS: u32 = 3;

/// Fresh pack names tried when a generated one is taken
const MAX_NAME_ATTEMPTS: u32 = 3;

/// Store state relevant to one incoming item
#[derive(Debug, Clone, Copy)]
pub struct Observed<'a> {
    pub set: Option<&'a StickerSet>,
    /// Row found by the unique-id-then-hash lookup
    pub matched: Option<&'a Sticker>,
    pub count_in_set: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateSetAndAdd,
    Add,
    Remove,
    /// Removal refused, the pack would become empty
    KeepLast,
    Duplicate,
}

/// Decision tree, evaluated in a fixed order
///
/// A match only means removal when the item was sent from the user's own
/// pack; any other match is a duplicate.
pub fn decide(observed: &Observed<'_>, origin_set_name: Option<&str>, policy: RemovalPolicy) -> Action {
    let Some(set) = observed.set else {
        return Action::CreateSetAndAdd;
    };

    if observed.matched.is_none() {
        return Action::Add;
    }

    if origin_set_name != Some(set.name.as_str()) {
        return Action::Duplicate;
    }

    match policy {
        RemovalPolicy::KeepLast if observed.count_in_set <= 1 => Action::KeepLast,
        _ => Action::Remove,
    }
}

/// What happened, for the reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(StickerSet),
    Added(StickerSet),
    Removed,
    /// Local row removed; the platform said the pack was already unchanged
    RemovalNotModified,
    LastStickerKept,
    Duplicate,
}

impl Outcome {
    pub fn reply_text(&self, admin_contact_url: &str) -> String {
        match self {
            Outcome::Created(set) => replies::pack_created(set),
            Outcome::Added(set) => replies::sticker_added(set),
            Outcome::Removed => replies::STICKER_REMOVED.to_string(),
            Outcome::RemovalNotModified => replies::removal_not_modified(admin_contact_url),
            Outcome::LastStickerKept => replies::LAST_STICKER_KEPT.to_string(),
            Outcome::Duplicate => replies::ALREADY_IN_PACK.to_string(),
        }
    }
}

/// Hash of an item plus its raw bytes when those had to be downloaded
struct Fingerprint {
    hash: ImageHash,
    raw_file: Option<Vec<u8>>,
}

/// Rows read for one item
#[derive(Debug, Default)]
struct Snapshot {
    user_id: Option<i64>,
    set: Option<StickerSet>,
    matched: Option<Sticker>,
    count_in_set: i64,
}

pub struct Reconciler {
    db: SqlitePool,
    mutator: PackMutator,
    policy: RemovalPolicy,
    user_locks: KeyedLocks,
}

impl Reconciler {
    pub fn new(db: SqlitePool, transport: Arc<dyn Transport>, policy: RemovalPolicy) -> Self {
        Self {
            db,
            mutator: PackMutator::new(transport),
            policy,
            user_locks: KeyedLocks::new(),
        }
    }

    /// Register a user without touching any pack
    pub async fn register_user(&self, telegram_id: i64) -> Result<(), BotError> {
        let key = telegram_id.to_string();
        let key = key.as_str();

        let user = retry_idempotent(
            "reconciler::register_user",
            MAX_STORE_ATTEMPTS,
            StoreError::is_retryable,
            move || self.ensure_user(key),
        )
        .await?;

        tracing::debug!(user_id = user.id, telegram_id, "User registered");
        Ok(())
    }

    /// Existing users are only read; the insert happens on first contact
    async fn ensure_user(&self, telegram_id: &str) -> Result<User, StoreError> {
        {
            let mut conn = self.db.acquire().await?;
            if let Some(user) = users::find_by_telegram_id(&mut conn, telegram_id).await? {
                return Ok(user);
            }
        }

        let mut tx = begin_monitored(&self.db, "reconciler::register_user").await?;
        let user = users::get_or_create(tx.conn(), telegram_id).await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn reconcile(&self, request: &MediaRequest) -> Result<Outcome, BotError> {
        let fingerprint = self.fingerprint(&request.media, request.category).await?;
        let hash_hex = fingerprint.hash.to_string();
        let hash = hash_hex.as_str();
        tracing::debug!(
            telegram_id = request.sender.id,
            category = %request.category,
            hash,
            "Media fingerprinted"
        );

        let _sender_lock = self.user_locks.lock(request.sender.id).await;

        let snapshot = retry_idempotent(
            "reconciler::observe",
            MAX_STORE_ATTEMPTS,
            StoreError::is_retryable,
            move || self.observe(request, hash),
        )
        .await?;

        let observed = Observed {
            set: snapshot.set.as_ref(),
            matched: snapshot.matched.as_ref(),
            count_in_set: snapshot.count_in_set,
        };
        let action = decide(&observed, request.media.origin_set_name(), self.policy);

        tracing::info!(
            telegram_id = request.sender.id,
            user_id = snapshot.user_id,
            category = %request.category,
            set_name = snapshot.set.as_ref().map(|s| s.name.as_str()),
            action = ?action,
            "Reconciliation decided"
        );

        match (action, snapshot.set, snapshot.matched) {
            (Action::CreateSetAndAdd, _, _) => {
                let attachment = self
                    .mutator
                    .prepare_attachment(&request.media, request.category, fingerprint.raw_file)
                    .await?;
                let (name, title) = self.create_remote_pack(request, attachment).await?;

                let name_ref = name.as_str();
                let title_ref = title.as_str();
                let stored = retry_idempotent(
                    "reconciler::store_new_set",
                    MAX_STORE_ATTEMPTS,
                    StoreError::is_retryable,
                    move || self.store_new_set(request, name_ref, title_ref, hash),
                )
                .await;
                let set = stored_after_remote(stored, &name)?;

                tracing::info!(user_id = set.user_id, set_name = %set.name, "Sticker pack created");
                Ok(Outcome::Created(set))
            }
            (Action::Add, Some(set), _) => {
                let attachment = self
                    .mutator
                    .prepare_attachment(&request.media, request.category, fingerprint.raw_file)
                    .await?;
                self.mutator
                    .add_to_pack(request.sender.id, &set, &request.emoji, attachment)
                    .await?;

                let set_id = set.id;
                let stored = retry_idempotent(
                    "reconciler::store_sticker",
                    MAX_STORE_ATTEMPTS,
                    StoreError::is_retryable,
                    move || self.store_sticker(set_id, request, hash),
                )
                .await;
                stored_after_remote(stored, &set.name)?;

                tracing::info!(user_id = set.user_id, set_name = %set.name, "Sticker added");
                Ok(Outcome::Added(set))
            }
            (Action::Remove, Some(set), Some(sticker)) => {
                let removal = self
                    .mutator
                    .remove_from_pack(request.media.file_id())
                    .await?;

                let sticker_id = sticker.id;
                let stored = retry_idempotent(
                    "reconciler::forget_sticker",
                    MAX_STORE_ATTEMPTS,
                    StoreError::is_retryable,
                    move || self.forget_sticker(sticker_id),
                )
                .await;
                stored_after_remote(stored, &set.name)?;

                tracing::info!(
                    user_id = set.user_id,
                    set_name = %set.name,
                    sticker_id,
                    removal = ?removal,
                    "Sticker removed"
                );
                Ok(match removal {
                    Removal::Removed => Outcome::Removed,
                    Removal::NotModified => Outcome::RemovalNotModified,
                })
            }
            (Action::KeepLast, _, _) => Ok(Outcome::LastStickerKept),
            (Action::Duplicate, _, _) => Ok(Outcome::Duplicate),
            (action, _, _) => Err(BotError::Internal(format!(
                "{:?} decided without the rows it needs",
                action
            ))),
        }
    }

    async fn fingerprint(
        &self,
        media: &IncomingMedia,
        category: StickerSetType,
    ) -> Result<Fingerprint, BotError> {
        match media {
            IncomingMedia::Photo(photo) => {
                let bytes = self.mutator.fetch_file(&photo.file_id).await?;
                let hash = average_hash_blocking(bytes.clone()).await?;
                Ok(Fingerprint {
                    hash,
                    raw_file: Some(bytes),
                })
            }
            IncomingMedia::Sticker(sticker) if category == StickerSetType::Regular => {
                let bytes = self.mutator.fetch_file(&sticker.file_id).await?;
                let hash = average_hash_blocking(bytes).await?;
                Ok(Fingerprint {
                    hash,
                    raw_file: None,
                })
            }
            IncomingMedia::Sticker(sticker) => match &sticker.thumbnail {
                Some(thumbnail) => {
                    let bytes = self.mutator.fetch_file(&thumbnail.file_id).await?;
                    let hash = average_hash_blocking(bytes).await?;
                    Ok(Fingerprint {
                        hash,
                        raw_file: None,
                    })
                }
                None => {
                    let bytes = self.mutator.fetch_file(&sticker.file_id).await?;
                    Ok(Fingerprint {
                        hash: content_digest(&bytes),
                        raw_file: Some(bytes),
                    })
                }
            },
        }
    }

    /// Read-only pass; an unknown user has no set yet
    async fn observe(&self, request: &MediaRequest, hash_hex: &str) -> Result<Snapshot, StoreError> {
        let mut tx = begin_monitored(&self.db, "reconciler::observe").await?;

        let telegram_id = request.sender.id.to_string();
        let Some(user) = users::find_by_telegram_id(tx.conn(), &telegram_id).await? else {
            tx.rollback().await?;
            return Ok(Snapshot::default());
        };

        let set =
            sticker_sets::find_by_user_and_category(tx.conn(), user.id, request.category).await?;
        let (matched, count_in_set) = match &set {
            Some(set) => {
                let matched = stickers::find_by_unique_id_or_hash(
                    tx.conn(),
                    set.id,
                    request.media.file_unique_id(),
                    hash_hex,
                )
                .await?;
                let count = stickers::count_in_set(tx.conn(), set.id).await?;
                (matched, count)
            }
            None => (None, 0),
        };

        tx.rollback().await?;

        Ok(Snapshot {
            user_id: Some(user.id),
            set,
            matched,
            count_in_set,
        })
    }

    /// Create the pack on the platform, regenerating the name when it is taken
    async fn create_remote_pack(
        &self,
        request: &MediaRequest,
        attachment: MediaAttachment,
    ) -> Result<(String, String), BotError> {
        let bot_username = self.mutator.bot_username().await?;
        let title = naming::pack_title(&request.sender.username, request.category);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let name = naming::pack_name(&request.sender.username, bot_username);

            match self
                .mutator
                .create_pack(request.sender.id, &name, &title, &request.emoji, attachment.clone())
                .await
            {
                Ok(()) => return Ok((name, title)),
                Err(err) if err.is_name_occupied() && attempt < MAX_NAME_ATTEMPTS => {
                    tracing::warn!(set_name = %name, attempt, "Pack name taken, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn store_new_set(
        &self,
        request: &MediaRequest,
        name: &str,
        title: &str,
        hash_hex: &str,
    ) -> Result<StickerSet, StoreError> {
        let mut tx = begin_monitored(&self.db, "reconciler::store_new_set").await?;

        let user = users::get_or_create(tx.conn(), &request.sender.id.to_string()).await?;
        let set = sticker_sets::create(tx.conn(), user.id, request.category, name, title).await?;
        stickers::save(
            tx.conn(),
            set.id,
            request.media.file_id(),
            request.media.file_unique_id(),
            hash_hex,
        )
        .await?;

        tx.commit().await?;
        Ok(set)
    }

    async fn store_sticker(
        &self,
        set_id: i64,
        request: &MediaRequest,
        hash_hex: &str,
    ) -> Result<(), StoreError> {
        let mut tx = begin_monitored(&self.db, "reconciler::store_sticker").await?;
        stickers::save(
            tx.conn(),
            set_id,
            request.media.file_id(),
            request.media.file_unique_id(),
            hash_hex,
        )
        .await?;
        tx.commit().await
    }

    async fn forget_sticker(&self, sticker_id: i64) -> Result<(), StoreError> {
        let mut tx = begin_monitored(&self.db, "reconciler::forget_sticker").await?;
        if !stickers::remove_by_id(tx.conn(), sticker_id).await? {
            tracing::debug!(sticker_id, "Sticker row already gone");
        }
        tx.commit().await
    }
}

/// Result of the write that follows a successful platform call
///
/// The platform already changed, so a failure here leaves store and pack
/// diverged. It is surfaced as internal and logged loudly.
fn stored_after_remote<T>(result: Result<T, StoreError>, set_name: &str) -> Result<T, BotError> {
    result.map_err(|err| {
        tracing::error!(
            set_name,
            error = %err,
            "Store write failed after pack mutation; store and pack diverge"
        );
        BotError::Internal(format!("store write after pack mutation failed: {}", err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn set(name: &str) -> StickerSet {
        StickerSet {
            id: 1,
            created_at: Utc::now(),
            user_id: 1,
            name: name.to_string(),
            title: "ada's Greatest Hits".to_string(),
            set_type: StickerSetType::Regular,
        }
    }

    fn sticker() -> Sticker {
        Sticker {
            id: 9,
            created_at: Utc::now(),
            file_id: "f1".to_string(),
            file_unique_id: "u1".to_string(),
            image_hash: "00000000000000ff".to_string(),
            sticker_set_id: 1,
        }
    }

    #[test]
    fn test_no_set_creates() {
        let observed = Observed {
            set: None,
            matched: None,
            count_in_set: 0,
        };
        assert_eq!(
            decide(&observed, Some("anything"), RemovalPolicy::KeepLast),
            Action::CreateSetAndAdd
        );
    }

    #[test]
    fn test_no_match_adds() {
        let own = set("ada_abcd_by_bot");
        let observed = Observed {
            set: Some(&own),
            matched: None,
            count_in_set: 4,
        };
        assert_eq!(decide(&observed, None, RemovalPolicy::KeepLast), Action::Add);
    }

    #[test]
    fn test_match_from_own_pack_removes() {
        let own = set("ada_abcd_by_bot");
        let row = sticker();
        let observed = Observed {
            set: Some(&own),
            matched: Some(&row),
            count_in_set: 2,
        };
        assert_eq!(
            decide(&observed, Some("ada_abcd_by_bot"), RemovalPolicy::KeepLast),
            Action::Remove
        );
    }

    #[test]
    fn test_match_from_elsewhere_is_duplicate() {
        let own = set("ada_abcd_by_bot");
        let row = sticker();
        let observed = Observed {
            set: Some(&own),
            matched: Some(&row),
            count_in_set: 2,
        };
        assert_eq!(
            decide(&observed, Some("someone_elses_pack"), RemovalPolicy::KeepLast),
            Action::Duplicate
        );
        assert_eq!(
            decide(&observed, None, RemovalPolicy::AllowEmpty),
            Action::Duplicate
        );
    }

    #[test]
    fn test_last_sticker_policy() {
        let own = set("ada_abcd_by_bot");
        let row = sticker();
        let observed = Observed {
            set: Some(&own),
            matched: Some(&row),
            count_in_set: 1,
        };
        assert_eq!(
            decide(&observed, Some("ada_abcd_by_bot"), RemovalPolicy::KeepLast),
            Action::KeepLast
        );
        assert_eq!(
            decide(&observed, Some("ada_abcd_by_bot"), RemovalPolicy::AllowEmpty),
            Action::Remove
        );
    }

    #[test]
    fn test_outcome_replies() {
        let created = Outcome::Created(set("ada_abcd_by_bot")).reply_text("https://t.me/admin");
        assert!(created.starts_with("Sticker pack created!"));
        assert!(created.contains("https://t.me/addstickers/ada_abcd_by_bot"));

        assert_eq!(
            Outcome::Duplicate.reply_text("https://t.me/admin"),
            replies::ALREADY_IN_PACK
        );
        assert!(Outcome::RemovalNotModified
            .reply_text("https://t.me/admin")
            .contains("https://t.me/admin"));
    }
}
