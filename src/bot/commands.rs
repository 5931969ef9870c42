//! Slash commands

use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use super::{admin, dialogue_manager, BotContext, ChatUser, HandlerResult};
use crate::dialogue::{reset_dialogue, CatalogDialogue, UserAction};
use crate::localization::t;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "abort the current action")]
    Cancel,
    #[command(description = "rename or re-photograph one of your products")]
    EditProduct,
    #[command(description = "delete all products and categories (admin)")]
    ClearAll,
    #[command(description = "rename a category (admin)")]
    ChangeCat,
    #[command(description = "move a product to another category (admin)")]
    ChangeList,
    #[command(description = "delete a product (admin)")]
    DelPosition,
    #[command(description = "delete a user and their products (admin)")]
    DelUser(String),
    #[command(description = "ban a user (admin)")]
    BanUser(String),
    #[command(description = "lift a ban (admin)")]
    UnbanUser(String),
}

impl Command {
    pub fn is_admin_only(&self) -> bool {
        !matches!(
            self,
            Command::Start | Command::Help | Command::Cancel | Command::EditProduct
        )
    }
}

/// Optional id argument of the user-moderation commands
fn id_argument(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Run a parsed command. Any dialog in progress is abandoned first.
pub async fn handle_command(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    command: Command,
) -> HandlerResult {
    reset_dialogue(dialogue).await?;

    if command.is_admin_only() && !ctx.is_admin(user.id) {
        warn!(user_id = user.id, command = ?command, "Rejected administrator command");
        return ctx.reply(user.id, &t("admin-only")).await;
    }

    info!(user_id = user.id, command = ?command, "Handling command");
    match command {
        Command::Start => dialogue_manager::send_welcome(ctx, user).await,
        Command::Help => dialogue_manager::send_help(ctx, user).await,
        Command::Cancel => ctx.reply_with_menu(user.id, &t("cancelled")).await,
        Command::EditProduct => dialogue_manager::start_edit_product(ctx, dialogue, user).await,
        Command::ClearAll => admin::clear_all(ctx, user).await,
        Command::ChangeCat => admin::start_rename_category(ctx, dialogue, user).await,
        Command::ChangeList => admin::start_move_product(ctx, dialogue, user).await,
        Command::DelPosition => admin::start_delete_product(ctx, dialogue, user).await,
        Command::DelUser(arg) => {
            admin::start_user_action(ctx, dialogue, user, UserAction::Delete, id_argument(&arg))
                .await
        }
        Command::BanUser(arg) => {
            admin::start_user_action(ctx, dialogue, user, UserAction::Ban, id_argument(&arg)).await
        }
        Command::UnbanUser(arg) => {
            admin::start_user_action(ctx, dialogue, user, UserAction::Unban, id_argument(&arg))
                .await
        }
    }
}
