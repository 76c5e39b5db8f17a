//! Shared fixtures for hits-bot integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use hits_bot::telegram::types::{Chat, File, Message, PhotoSize, Sticker, Update, User};
use hits_bot::telegram::{MediaAttachment, Transport, TransportError};
use hits_bot::AppState;
use hits_common::config::RawConfig;
use hits_common::db::init_database;
use hits_common::BotConfig;
use image::{ImageBuffer, ImageFormat, Luma};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOT_USERNAME: &str = "hits_test_bot";
pub const USER_ID: i64 = 1001;

/// One recorded transport call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Reply { chat_id: i64, text: String },
    GetFile(String),
    CreateSet { name: String, title: String, emoji: String, attachment: MediaAttachment },
    AddSticker { name: String, emoji: String, attachment: MediaAttachment },
    DeleteSticker(String),
}

/// In-process transport that records calls and serves canned files
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    delete_error: Mutex<Option<TransportError>>,
    mutation_error: Mutex<Option<TransportError>>,
    create_delay: Mutex<Option<(i64, Duration)>>,
    occupied_names: Mutex<u32>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `bytes` for `file_id`
    pub fn put_file(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(file_id.to_string(), bytes);
    }

    pub fn fail_deletes_with(&self, err: TransportError) {
        *self.delete_error.lock().unwrap() = Some(err);
    }

    /// Fail every create/add call
    pub fn fail_mutations_with(&self, err: TransportError) {
        *self.mutation_error.lock().unwrap() = Some(err);
    }

    /// Hold every create call made for `user_id` for `delay`
    pub fn delay_creates_for(&self, user_id: i64, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some((user_id, delay));
    }

    /// Refuse the next `count` create calls as if the name were taken
    pub fn occupy_next_names(&self, count: u32) {
        *self.occupied_names.lock().unwrap() = count;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::CreateSet { .. } | Call::AddSticker { .. } | Call::DeleteSticker(_)
                )
            })
            .collect()
    }

    pub fn replies(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Reply { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn mutation_result(&self) -> Result<(), TransportError> {
        match self.mutation_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get_me(&self) -> Result<User, TransportError> {
        Ok(User {
            id: 1,
            is_bot: true,
            first_name: "Hits".to_string(),
            last_name: None,
            username: Some(BOT_USERNAME.to_string()),
        })
    }

    async fn reply(
        &self,
        chat_id: i64,
        _reply_to_message_id: i64,
        html: &str,
    ) -> Result<(), TransportError> {
        self.record(Call::Reply {
            chat_id,
            text: html.to_string(),
        });
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<File, TransportError> {
        self.record(Call::GetFile(file_id.to_string()));
        if !self.files.lock().unwrap().contains_key(file_id) {
            return Err(TransportError::Api {
                code: 400,
                description: "Bad Request: invalid file_id".to_string(),
            });
        }
        Ok(File {
            file_id: file_id.to_string(),
            file_unique_id: format!("unique-{}", file_id),
            file_size: None,
            file_path: Some(file_id.to_string()),
        })
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("fake://{}", file_path)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let file_id = url.trim_start_matches("fake://");
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| TransportError::Network(format!("no such file {}", file_id)))
    }

    async fn create_sticker_set(
        &self,
        user_id: i64,
        name: &str,
        title: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        self.record(Call::CreateSet {
            name: name.to_string(),
            title: title.to_string(),
            emoji: emoji.to_string(),
            attachment,
        });

        let delay = *self.create_delay.lock().unwrap();
        if let Some((slow_user, delay)) = delay {
            if slow_user == user_id {
                tokio::time::sleep(delay).await;
            }
        }

        {
            let mut occupied = self.occupied_names.lock().unwrap();
            if *occupied > 0 {
                *occupied -= 1;
                return Err(TransportError::Api {
                    code: 400,
                    description: "Bad Request: sticker set name is already occupied".to_string(),
                });
            }
        }

        self.mutation_result()
    }

    async fn add_sticker_to_set(
        &self,
        _user_id: i64,
        name: &str,
        emoji: &str,
        attachment: MediaAttachment,
    ) -> Result<(), TransportError> {
        self.record(Call::AddSticker {
            name: name.to_string(),
            emoji: emoji.to_string(),
            attachment,
        });
        self.mutation_result()
    }

    async fn delete_sticker_from_set(&self, sticker_file_id: &str) -> Result<(), TransportError> {
        self.record(Call::DeleteSticker(sticker_file_id.to_string()));
        match self.delete_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn test_config(allow_empty_pack: bool) -> BotConfig {
    BotConfig::from_raw(RawConfig {
        api_token: Some("123:abc".to_string()),
        poll_type: Some("POLLING".to_string()),
        database_url: Some("sqlite::memory:".to_string()),
        admin_username: Some("hits_admin".to_string()),
        allow_empty_pack: Some(allow_empty_pack),
        ..Default::default()
    })
    .unwrap()
}

pub async fn test_state(transport: Arc<RecordingTransport>, allow_empty_pack: bool) -> AppState {
    state_with_config(transport, test_config(allow_empty_pack)).await
}

pub async fn state_with_config(transport: Arc<RecordingTransport>, config: BotConfig) -> AppState {
    let pool = init_database("sqlite::memory:").await.unwrap();
    AppState::new(pool, config, transport)
}

/// State over a database file, so separate connections contend for locks
pub async fn file_backed_state(transport: Arc<RecordingTransport>, dir: &Path) -> AppState {
    let url = format!("sqlite://{}", dir.join("hits.db").display());
    let pool = init_database(&url).await.unwrap();
    AppState::new(pool, test_config(false), transport)
}

/// Grayscale PNG with a distinct pattern per `seed`
pub fn png_pattern(seed: u8) -> Vec<u8> {
    let image = ImageBuffer::from_fn(64, 64, |x, y| {
        let bright = match seed % 4 {
            0 => x < 32,
            1 => y < 32,
            2 => (x / 8 + y / 8) % 2 == 0,
            _ => x + y < 64,
        };
        Luma([if bright { 230u8 } else { 20u8 }])
    });
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn sender() -> User {
    User {
        id: USER_ID,
        is_bot: false,
        first_name: "Ada".to_string(),
        last_name: Some("Lovelace".to_string()),
        username: Some("ada".to_string()),
    }
}

/// The same update sent by another private-chat user
pub fn from_user(mut update: Update, user_id: i64, username: &str) -> Update {
    if let Some(msg) = update.message.as_mut() {
        msg.chat = Chat { id: user_id };
        msg.from = Some(User {
            id: user_id,
            is_bot: false,
            first_name: username.to_string(),
            last_name: None,
            username: Some(username.to_string()),
        });
    }
    update
}

fn message(message_id: i64) -> Message {
    Message {
        message_id,
        chat: Chat { id: USER_ID },
        from: Some(sender()),
        text: None,
        caption: None,
        sticker: None,
        photo: None,
    }
}

pub fn sticker(file_id: &str, unique_id: &str, set_name: Option<&str>) -> Sticker {
    Sticker {
        file_id: file_id.to_string(),
        file_unique_id: unique_id.to_string(),
        width: 512,
        height: 512,
        is_animated: false,
        is_video: false,
        emoji: Some("😀".to_string()),
        set_name: set_name.map(str::to_string),
        thumbnail: None,
    }
}

pub fn sticker_update(update_id: i64, sticker: Sticker) -> Update {
    let mut msg = message(update_id);
    msg.sticker = Some(sticker);
    Update {
        update_id,
        message: Some(msg),
    }
}

pub fn photo_update(update_id: i64, file_id: &str, caption: Option<&str>) -> Update {
    let mut msg = message(update_id);
    msg.caption = caption.map(str::to_string);
    msg.photo = Some(vec![
        PhotoSize {
            file_id: format!("{}-small", file_id),
            file_unique_id: format!("{}-small-unique", file_id),
            width: 90,
            height: 90,
            file_size: None,
        },
        PhotoSize {
            file_id: file_id.to_string(),
            file_unique_id: format!("{}-unique", file_id),
            width: 640,
            height: 640,
            file_size: None,
        },
    ]);
    Update {
        update_id,
        message: Some(msg),
    }
}

pub fn text_update(update_id: i64, text: &str) -> Update {
    let mut msg = message(update_id);
    msg.text = Some(text.to_string());
    Update {
        update_id,
        message: Some(msg),
    }
}
