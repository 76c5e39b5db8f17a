//! Bot API HTTP client
//!
//! Thin reqwest wrapper: one method per Bot API call, every response decoded
//! through the `{ok, result, description, error_code}` envelope.
//!
//! The API token is part of every URL; URLs are never logged.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use super::transport::{MediaAttachment, StickerSource, Transport, TransportError};
use super::types::{ApiResponse, File, Update, User};

const USER_AGENT: &str = concat!("hits-bot/", env!("CARGO_PKG_VERSION"));

/// Server-side wait of a `getUpdates` long poll
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Client-side timeout; must outlive a long poll
const REQUEST_TIMEOUT_SECS: u64 = LONG_POLL_TIMEOUT_SECS + 15;

/// Multipart field carrying an uploaded sticker
const UPLOAD_FIELD: &str = "sticker_file";

/// Bot API client
pub struct TelegramClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call_json<P, T>(&self, method: &str, params: &P) -> Result<T, TransportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(method, "Calling Bot API");

        let response = self
            .http_client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        decode_response(method, response).await
    }

    async fn call_multipart<T>(&self, method: &str, form: Form) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(method, "Calling Bot API (multipart)");

        let response = self
            .http_client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        decode_response(method, response).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let params = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call_json("getUpdates", &params).await
    }

    /// Register the webhook URL with the platform
    pub async fn set_webhook(&self, url: &str) -> Result<(), TransportError> {
        let params = json!({
            "url": url,
            "allowed_updates": ["message"],
        });
        let _: bool = self.call_json("setWebhook", &params).await?;
        Ok(())
    }

    /// Remove any registered webhook
    pub async fn delete_webhook(&self) -> Result<(), TransportError> {
        let _: bool = self.call_json("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

/// Decode the Bot API envelope, mapping `ok: false` to [`TransportError::Api`]
async fn decode_response<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

    let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(TransportError::Api {
                code: i64::from(status.as_u16()),
                description: body.chars().take(200).collect(),
            })
        }
        Err(e) => return Err(TransportError::Parse(format!("{}: {}", method, e))),
    };

    if !envelope.ok {
        let err = TransportError::Api {
            code: envelope
                .error_code
                .unwrap_or_else(|| i64::from(status.as_u16())),
            description: envelope.description.unwrap_or_default(),
        };
        tracing::debug!(method, error = %err, "Bot API call rejected");
        return Err(err);
    }

    envelope
        .result
        .ok_or_else(|| TransportError::Parse(format!("{}: missing result", method)))
}

/// Split an attachment into the InputSticker JSON and an optional upload part
fn input_sticker(attachment: MediaAttachment, emoji: &str) -> (serde_json::Value, Option<Part>) {
    let (sticker_ref, part) = match attachment.source {
        StickerSource::FileId(file_id) => (file_id, None),
        StickerSource::Upload { file_name, bytes } => (
            format!("attach://{}", UPLOAD_FIELD),
            Some(Part::bytes(bytes).file_name(file_name)),
        ),
    };

    let input = json!({
        "sticker": sticker_ref,
        "format": attachment.format.as_str(),
        "emoji_list": [emoji],
    });

    (input, part)
}

#[async_trait]
impl Transport for TelegramClient {
    async fn get_me(&self) -> Result<User, TransportError> {
        self.call_json("getMe", &json!({})).await
    }

    async fn reply(
        &self,
        chat_id: i64,
        reply_to_message_id: i64,
        html: &str,
    ) -> Result<(), TransportError> {
        let params = json!({
            "chat_id": chat_id,
            "text": html,
            "parse_mode": "HTML",
            "reply_parameters": {
                "message_id": reply_to_message_id,
                "allow_sending_without_reply": true,
            },
        });
        let _: serde_json::Value = self.call_json("sendMessage", &params).await?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<File, TransportError> {
        self.call_json("getFile", &json!({ "file_id": file_id })).await
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                code: i64::from(status.as_u16()),
                description: "file download failed".to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        tracing::debug!(bytes = bytes.len(), "Downloaded file");

        Ok(bytes.to_vec())
    }

    async fn create_sticker_set(
        &self,
        user_id: i64,
        name: &str,
        title: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        let (input, part) = input_sticker(attachment, emoji);

        let mut form = Form::new()
            .text("user_id", user_id.to_string())
            .text("name", name.to_string())
            .text("title", title.to_string())
            .text("stickers", json!([input]).to_string());
        if let Some(part) = part {
            form = form.part(UPLOAD_FIELD, part);
        }

        let _: bool = self.call_multipart("createNewStickerSet", form).await?;
        tracing::info!(user_id, set_name = name, "Sticker set created on platform");
        Ok(())
    }

    async fn add_sticker_to_set(
        &self,
        user_id: i64,
        name: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        let (input, part) = input_sticker(attachment, emoji);

        let mut form = Form::new()
            .text("user_id", user_id.to_string())
            .text("name", name.to_string())
            .text("sticker", input.to_string());
        if let Some(part) = part {
            form = form.part(UPLOAD_FIELD, part);
        }

        let _: bool = self.call_multipart("addStickerToSet", form).await?;
        tracing::info!(user_id, set_name = name, "Sticker added on platform");
        Ok(())
    }

    async fn delete_sticker_from_set(&self, sticker_file_id: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call_json("deleteStickerFromSet", &json!({ "sticker": sticker_file_id }))
            .await?;
        tracing::info!("Sticker deleted on platform");
        Ok(())
    }
}
