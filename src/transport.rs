//! # Chat Transport
//!
//! Outbound side of the bot. The dialog engine talks to [`ChatTransport`] and
//! describes keyboards with the transport-neutral [`Keyboard`] type;
//! [`TelegramTransport`] turns both into Bot API calls.

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    ReplyMarkup,
};

/// Button that fires a callback carrying `token` instead of sending text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub token: String,
}

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Persistent reply keyboard; pressing a button sends its label as text
    Reply(Vec<Vec<String>>),
    /// Buttons attached to the message itself
    Inline(Vec<Vec<InlineButton>>),
}

impl Keyboard {
    /// Every label on the keyboard, row by row
    pub fn labels(&self) -> Vec<String> {
        match self {
            Keyboard::Reply(rows) => rows.iter().flatten().cloned().collect(),
            Keyboard::Inline(rows) => rows.iter().flatten().map(|b| b.label.clone()).collect(),
        }
    }
}

impl From<Keyboard> for ReplyMarkup {
    fn from(keyboard: Keyboard) -> Self {
        match keyboard {
            Keyboard::Reply(rows) => {
                let buttons: Vec<Vec<KeyboardButton>> = rows
                    .into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new).collect())
                    .collect();
                ReplyMarkup::Keyboard(KeyboardMarkup::new(buttons).resize_keyboard())
            }
            Keyboard::Inline(rows) => {
                let buttons: Vec<Vec<InlineKeyboardButton>> = rows
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|b| InlineKeyboardButton::callback(b.label, b.token))
                            .collect()
                    })
                    .collect();
                ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(buttons))
            }
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<()>;

    /// Send a previously uploaded photo by its opaque reference
    async fn send_photo(&self, chat_id: i64, photo_ref: &str, caption: &str) -> Result<()>;
}

/// [`ChatTransport`] backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<()> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        match keyboard {
            Some(keyboard) => request.reply_markup(ReplyMarkup::from(keyboard)).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, photo_ref: &str, caption: &str) -> Result<()> {
        self.bot
            .send_photo(ChatId(chat_id), InputFile::file_id(FileId(photo_ref.to_string())))
            .caption(caption)
            .await?;
        Ok(())
    }
}
