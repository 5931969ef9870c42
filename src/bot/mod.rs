//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: entry point for messages, ban guard and step dispatch
//! - `callback_handler`: inline keyboard callbacks (show photo)
//! - `commands`: slash command definitions and routing
//! - `dialogue_manager`: user-facing dialog steps (add, browse, edit own products)
//! - `admin`: administrator dialog steps
//! - `ui_builder`: keyboards and message formatting

pub mod admin;
pub mod callback_handler;
pub mod commands;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::catalog::{self, CatalogStore};
use crate::dialogue::{CatalogDialogue, ConversationStorage};
use crate::transport::{ChatTransport, Keyboard};

pub use callback_handler::{callback_handler, handle_callback};
pub use commands::Command;
pub use message_handler::{handle_inbound, message_handler};

pub type HandlerResult = anyhow::Result<()>;

/// Shared dependencies of every handler
pub struct BotContext {
    pub store: Arc<dyn CatalogStore>,
    pub transport: Arc<dyn ChatTransport>,
    /// Telegram id of the administrator; 0 when none is configured
    pub admin_id: i64,
    /// Used to accept commands addressed as `/cmd@username`
    pub bot_username: String,
}

impl BotContext {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id != 0 && user_id == self.admin_id
    }

    pub async fn reply(&self, user_id: i64, text: &str) -> HandlerResult {
        self.transport.send_text(user_id, text, None).await
    }

    pub async fn reply_with(&self, user_id: i64, text: &str, keyboard: Keyboard) -> HandlerResult {
        self.transport.send_text(user_id, text, Some(keyboard)).await
    }

    /// Send `text` together with the main menu, bell reflecting the user's
    /// current notification preference
    pub async fn reply_with_menu(&self, user_id: i64, text: &str) -> HandlerResult {
        let enabled = catalog::notification_status(self.store.as_ref(), user_id).await;
        self.reply_with(user_id, text, ui_builder::main_menu_keyboard(enabled))
            .await
    }
}

/// The sender of an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: i64,
    pub display_name: String,
}

impl ChatUser {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Transport-neutral view of an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Photo {
        photo_ref: String,
        caption: Option<String>,
    },
    /// Stickers, documents, voice and everything else
    Unsupported,
}

/// Per-user handle into the shared conversation table.
///
/// Users are only served in private chats, so the chat id is the user id.
pub fn dialogue_for(storage: Arc<ConversationStorage>, user_id: i64) -> CatalogDialogue {
    CatalogDialogue::new(storage, ChatId(user_id))
}

/// Update routing: messages and callback queries
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
