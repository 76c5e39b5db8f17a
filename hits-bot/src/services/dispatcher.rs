//! Per-update handler
//!
//! Every update with a sender gets exactly one reply: the outcome text,
//! a user-input hint, or the generic failure text. Updates without a
//! sender are logged and dropped.

use super::pipeline::{self, Inbound, ReplyTarget};
use crate::error::BotError;
use crate::replies;
use crate::telegram::types::{Message, Update};
use crate::AppState;

/// Handle one update under the configured timeout
pub async fn handle_update(state: &AppState, update: Update) {
    let update_id = update.update_id;
    let Some(message) = update.message else {
        tracing::debug!(update_id, "Update without message ignored");
        return;
    };

    let target = ReplyTarget::of(&message);
    let timeout = state.config.handler_timeout;

    let result = match tokio::time::timeout(timeout, handle_message(state, &message)).await {
        Ok(result) => result,
        Err(_) => Err(BotError::Timeout(timeout)),
    };

    let reply = match result {
        Ok(text) => Some(text),
        Err(err) => {
            log_failure(update_id, &err);
            if !err.is_user_facing() {
                *state.last_error.write().await = Some(err.to_string());
            }
            err.reply_text()
        }
    };

    if let Some(text) = reply {
        send_reply(state, target, &text).await;
    }
}

async fn handle_message(state: &AppState, message: &Message) -> Result<String, BotError> {
    match pipeline::parse(message)? {
        Inbound::Start(sender) => {
            state.reconciler.register_user(sender.id).await?;
            Ok(replies::greeting(&sender.full_name))
        }
        Inbound::Media(request) => {
            let outcome = state.reconciler.reconcile(&request).await?;
            Ok(outcome.reply_text(&state.config.admin_contact_url()))
        }
    }
}

async fn send_reply(state: &AppState, target: ReplyTarget, text: &str) {
    if let Err(e) = state
        .transport
        .reply(target.chat_id, target.message_id, text)
        .await
    {
        tracing::error!(
            chat_id = target.chat_id,
            error = %e,
            "Failed to send reply"
        );
    }
}

fn log_failure(update_id: i64, err: &BotError) {
    match err {
        BotError::NoSender => {
            tracing::warn!(update_id, "Message without sender dropped");
        }
        err if err.is_user_facing() => {
            tracing::info!(update_id, reason = %err, "Message rejected");
        }
        BotError::Timeout(limit) => {
            tracing::error!(
                update_id,
                limit_ms = limit.as_millis() as u64,
                "Update handler timed out and was dropped"
            );
        }
        err => {
            tracing::error!(update_id, error = %err, "Update handling failed");
        }
    }
}
