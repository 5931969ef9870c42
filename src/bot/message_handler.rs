//! Message Handler module for processing incoming Telegram messages
//!
//! [`message_handler`] adapts a teloxide [`Message`] into an [`Inbound`] event;
//! [`handle_inbound`] is the transport-independent engine entry point that
//! applies the ban guard and dispatches on the user's conversation state.

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use super::commands::{self, Command};
use super::ui_builder::{
    self, ADD_PRODUCT, BACK, BROWSE_AVOIDED, BROWSE_RECOMMENDED, HELP, NOTIFICATIONS_OFF,
    NOTIFICATIONS_ON,
};
use super::{admin, dialogue_for, dialogue_manager, BotContext, ChatUser, HandlerResult, Inbound};
use crate::catalog;
use crate::dialogue::{
    reset_dialogue, CatalogDialogue, CategoryPurpose, ConversationState, ConversationStorage,
};
use crate::localization::t;
use crate::models::Rating;

/// teloxide endpoint for message updates
pub async fn message_handler(
    msg: Message,
    ctx: Arc<BotContext>,
    storage: Arc<ConversationStorage>,
) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };

    if !msg.chat.is_private() {
        debug!(chat_id = %msg.chat.id, "Ignoring message outside a private chat");
        return Ok(());
    }

    let user = ChatUser::new(from.id.0 as i64, from.full_name());
    let inbound = inbound_from_message(&msg);
    handle_inbound(&ctx, storage, &user, inbound).await
}

/// Classify a Telegram message
pub fn inbound_from_message(msg: &Message) -> Inbound {
    if let Some(text) = msg.text() {
        return Inbound::Text(text.to_string());
    }

    // Telegram lists sizes smallest first
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Inbound::Photo {
            photo_ref: photo.file.id.0.clone(),
            caption: msg.caption().map(str::to_string),
        };
    }

    Inbound::Unsupported
}

/// Engine entry point for one inbound event.
///
/// Banned users are answered with "access denied" and nothing else happens.
/// Failures inside a step are logged, the user's dialog is cleared and a
/// generic failure message is sent; they never propagate to the dispatcher.
pub async fn handle_inbound(
    ctx: &BotContext,
    storage: Arc<ConversationStorage>,
    user: &ChatUser,
    inbound: Inbound,
) -> HandlerResult {
    if catalog::is_banned(ctx.store.as_ref(), ctx.admin_id, user.id).await {
        info!(user_id = user.id, "Denied access to banned user");
        return ctx.reply(user.id, &t("access-denied")).await;
    }

    catalog::ensure_user(ctx.store.as_ref(), user.id).await;

    let dialogue = dialogue_for(storage, user.id);
    let result = match inbound {
        Inbound::Text(text) => handle_text_message(ctx, &dialogue, user, &text).await,
        Inbound::Photo { photo_ref, caption } => {
            handle_photo_message(ctx, &dialogue, user, photo_ref, caption).await
        }
        Inbound::Unsupported => handle_unsupported_message(ctx, user).await,
    };

    if let Err(e) = result {
        error!(user_id = user.id, error = %e, "Failed to handle message");
        if let Err(e) = reset_dialogue(&dialogue).await {
            error!(user_id = user.id, error = %e, "Failed to reset dialogue");
        }
        if let Err(e) = ctx.reply_with_menu(user.id, &t("generic-error")).await {
            warn!(user_id = user.id, error = %e, "Failed to send failure notice");
        }
    }

    Ok(())
}

async fn handle_text_message(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    text: &str,
) -> HandlerResult {
    debug!(user_id = user.id, message_length = text.len(), "Received text message from user");
    let text = text.trim();

    if text.starts_with('/') {
        return match Command::parse(text, &ctx.bot_username) {
            Ok(command) => commands::handle_command(ctx, dialogue, user, command).await,
            Err(e) => {
                debug!(user_id = user.id, error = %e, "Unrecognized command");
                ctx.reply(user.id, &t("unknown-command")).await
            }
        };
    }

    // Main menu buttons win over whatever dialog is in progress
    if ui_builder::is_main_menu_label(text) {
        reset_dialogue(dialogue).await?;
        return handle_main_menu(ctx, dialogue, user, text).await;
    }

    let state = dialogue.get_or_default().await?;
    if !state.is_idle() && text == BACK {
        debug!(user_id = user.id, "Dialog abandoned with Back");
        reset_dialogue(dialogue).await?;
        return ctx.reply_with_menu(user.id, &t("main-menu-prompt")).await;
    }

    match state {
        ConversationState::Idle => {
            ctx.reply_with_menu(user.id, &t("use-menu-buttons")).await
        }
        ConversationState::ChoosingCategory { purpose, categories } => {
            dialogue_manager::handle_category_choice(ctx, dialogue, user, purpose, categories, text)
                .await
        }
        ConversationState::AddingCategory => {
            dialogue_manager::handle_new_category_name(ctx, dialogue, user, text).await
        }
        ConversationState::AwaitingProductName {
            category_id,
            photo_ref,
        } => {
            dialogue_manager::handle_product_name(ctx, dialogue, user, category_id, photo_ref, text)
                .await
        }
        ConversationState::AwaitingRating {
            category_id,
            product_name,
            photo_ref,
        } => {
            dialogue_manager::handle_rating(
                ctx,
                dialogue,
                user,
                category_id,
                product_name,
                photo_ref,
                text,
            )
            .await
        }
        ConversationState::SelectingUser { action, users } => {
            admin::handle_user_selection(ctx, dialogue, user, action, users, text).await
        }
        ConversationState::SelectingCategoryToRename { categories } => {
            admin::handle_rename_selection(ctx, dialogue, user, categories, text).await
        }
        ConversationState::EnteringNewCategoryName {
            category_id,
            current_name,
        } => {
            admin::handle_new_category_name(ctx, dialogue, user, category_id, current_name, text)
                .await
        }
        ConversationState::SelectingProductToMove { products } => {
            admin::handle_move_selection(ctx, dialogue, user, products, text).await
        }
        ConversationState::SelectingNewCategoryForProduct {
            product_id,
            categories,
        } => admin::handle_move_target(ctx, dialogue, user, product_id, categories, text).await,
        ConversationState::SelectingProductToDelete { products } => {
            admin::handle_delete_selection(ctx, dialogue, user, products, text).await
        }
        ConversationState::SelectingProductToEdit { products } => {
            dialogue_manager::handle_edit_selection(ctx, dialogue, user, products, text).await
        }
        ConversationState::ChoosingEditField { product_id } => {
            dialogue_manager::handle_edit_field_choice(ctx, dialogue, user, product_id, text).await
        }
        ConversationState::EditingProductName { product_id } => {
            dialogue_manager::handle_edited_name(ctx, dialogue, user, product_id, text).await
        }
        ConversationState::EditingProductPhoto { .. } => {
            ctx.reply_with(user.id, &t("photo-expected"), ui_builder::back_keyboard())
                .await
        }
    }
}

async fn handle_main_menu(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    label: &str,
) -> HandlerResult {
    match label {
        ADD_PRODUCT => {
            dialogue_manager::start_category_choice(ctx, dialogue, user, CategoryPurpose::Add).await
        }
        BROWSE_RECOMMENDED => {
            let purpose = CategoryPurpose::View(Rating::Recommend);
            dialogue_manager::start_category_choice(ctx, dialogue, user, purpose).await
        }
        BROWSE_AVOIDED => {
            let purpose = CategoryPurpose::View(Rating::Avoid);
            dialogue_manager::start_category_choice(ctx, dialogue, user, purpose).await
        }
        HELP => dialogue_manager::send_help(ctx, user).await,
        NOTIFICATIONS_ON | NOTIFICATIONS_OFF => {
            dialogue_manager::toggle_notifications(ctx, user).await
        }
        _ => ctx.reply_with_menu(user.id, &t("use-menu-buttons")).await,
    }
}

async fn handle_photo_message(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    photo_ref: String,
    caption: Option<String>,
) -> HandlerResult {
    debug!(user_id = user.id, has_caption = caption.is_some(), "Received photo from user");

    match dialogue.get_or_default().await? {
        ConversationState::AwaitingProductName { category_id, .. } => {
            dialogue_manager::handle_product_photo(
                ctx,
                dialogue,
                user,
                category_id,
                photo_ref,
                caption,
            )
            .await
        }
        ConversationState::EditingProductPhoto { product_id } => {
            dialogue_manager::handle_edited_photo(ctx, dialogue, user, product_id, &photo_ref)
                .await
        }
        _ => ctx.reply(user.id, &t("use-menu-buttons")).await,
    }
}

async fn handle_unsupported_message(ctx: &BotContext, user: &ChatUser) -> HandlerResult {
    debug!(user_id = user.id, "Received unsupported message type");
    ctx.reply(user.id, &t("use-menu-buttons")).await
}
