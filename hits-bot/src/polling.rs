//! Long-poll receiver
//!
//! Drops any registered webhook and skips updates queued while the bot was
//! down, then loops on `getUpdates`, spawning one task per update. Failures
//! back off from 1 s up to 30 s; the loop ends when the cancellation token
//! fires.

use tokio_util::sync::CancellationToken;

use crate::services::handle_update;
use crate::telegram::client::LONG_POLL_TIMEOUT_SECS;
use crate::telegram::types::Update;
use crate::telegram::{TelegramClient, TransportError};
use crate::utils::Backoff;
use crate::AppState;

const ERROR_BACKOFF_INITIAL_MS: u64 = 1_000;
const ERROR_BACKOFF_MAX_MS: u64 = 30_000;

/// Next offset acknowledging every update up to `update_id`
fn next_offset(current: Option<i64>, update_id: i64) -> Option<i64> {
    Some(current.map_or(update_id + 1, |offset| offset.max(update_id + 1)))
}

/// Offset acknowledging every update in `updates`
fn offset_after(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    updates
        .iter()
        .fold(current, |offset, update| next_offset(offset, update.update_id))
}

/// Offset past the backlog
///
/// `offset = -1` returns only the newest pending update; polling from just
/// after it confirms everything older without handling it.
async fn skip_backlog(client: &TelegramClient) -> Result<Option<i64>, TransportError> {
    let newest = client.get_updates(Some(-1), 0).await?;
    let offset = offset_after(None, &newest);
    if let Some(offset) = offset {
        tracing::info!(skipped_through = offset - 1, "Pending updates skipped");
    }
    Ok(offset)
}

pub async fn run_polling(
    state: AppState,
    client: &TelegramClient,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    client.delete_webhook().await?;
    let mut offset = skip_backlog(client).await?;
    tracing::info!("Webhook removed, long polling started");

    let mut backoff = Backoff::new(ERROR_BACKOFF_INITIAL_MS, ERROR_BACKOFF_MAX_MS);

    loop {
        let batch = tokio::select! {
            _ = shutdown.cancelled() => break,
            batch = client.get_updates(offset, LONG_POLL_TIMEOUT_SECS) => batch,
        };

        match batch {
            Ok(updates) => {
                backoff.reset(ERROR_BACKOFF_INITIAL_MS);
                if !updates.is_empty() {
                    tracing::debug!(count = updates.len(), "Updates received");
                }
                for update in updates {
                    offset = next_offset(offset, update.update_id);
                    let state = state.clone();
                    tokio::spawn(async move {
                        handle_update(&state, update).await;
                    });
                }
            }
            Err(e) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    error = %e,
                    backoff_ms = delay.as_millis() as u64,
                    "getUpdates failed, backing off"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::info!("Long polling stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_moves_past_latest_update() {
        assert_eq!(next_offset(None, 10), Some(11));
        assert_eq!(next_offset(Some(11), 12), Some(13));
        // out-of-order ids never move the offset back
        assert_eq!(next_offset(Some(20), 12), Some(20));
    }

    #[test]
    fn test_backlog_offset_follows_newest_update() {
        let update = |update_id| Update {
            update_id,
            message: None,
        };
        assert_eq!(offset_after(None, &[]), None);
        assert_eq!(offset_after(None, &[update(41)]), Some(42));
        assert_eq!(offset_after(Some(50), &[update(41), update(60)]), Some(61));
    }
}
