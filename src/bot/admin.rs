//! Administrator dialog steps
//!
//! Only reachable through admin commands, which are gated on the configured
//! administrator id before any of these functions run.

use tracing::{info, warn};

use super::dialogue_manager::{reprompt_category_name, reprompt_selection};
use super::ui_builder::{self, back_keyboard, number_keyboard, with_list};
use super::{BotContext, ChatUser, HandlerResult};
use crate::dialogue::{
    parse_selection, reset_dialogue, validate_category_name, CatalogDialogue, ConversationState,
    UserAction,
};
use crate::errors::CatalogError;
use crate::localization::{t, t_args};
use crate::models::{Category, CategoryId, ProductEntry, ProductId, UserSummary};

pub async fn clear_all(ctx: &BotContext, user: &ChatUser) -> HandlerResult {
    ctx.store.clear_all().await?;
    warn!(user_id = user.id, "Catalog cleared by administrator");
    ctx.reply_with_menu(user.id, &t("catalog-cleared")).await
}

/// Open the user picker for `action`, or act right away when the command
/// carried an explicit id
pub async fn start_user_action(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    action: UserAction,
    id_argument: Option<&str>,
) -> HandlerResult {
    if let Some(raw) = id_argument {
        return match raw.parse::<i64>() {
            Ok(target) => apply_user_action(ctx, user, action, target).await,
            Err(_) => ctx.reply_with_menu(user.id, &t("invalid-user-id")).await,
        };
    }

    let (users, header, empty) = match action {
        UserAction::Unban => (
            ctx.store.list_banned_users().await?,
            "choose-user-unban",
            "no-banned-users",
        ),
        UserAction::Delete | UserAction::Ban => {
            let header = if action == UserAction::Ban {
                "choose-user-ban"
            } else {
                "choose-user-delete"
            };
            (ctx.store.list_distinct_users().await?, header, "no-users")
        }
    };

    let users: Vec<UserSummary> = users
        .into_iter()
        .filter(|u| u.telegram_id != ctx.admin_id)
        .collect();

    if users.is_empty() {
        return ctx.reply_with_menu(user.id, &t(empty)).await;
    }

    let text = with_list(&t(header), &ui_builder::format_users(&users));
    let keyboard = number_keyboard(users.len(), false, true);
    dialogue
        .update(ConversationState::SelectingUser { action, users })
        .await?;
    ctx.reply_with(user.id, &text, keyboard).await
}

pub async fn handle_user_selection(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    action: UserAction,
    users: Vec<UserSummary>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, users.len()) else {
        return reprompt_selection(ctx, user, users.len(), false).await;
    };

    reset_dialogue(dialogue).await?;
    apply_user_action(ctx, user, action, users[index].telegram_id).await
}

async fn apply_user_action(
    ctx: &BotContext,
    user: &ChatUser,
    action: UserAction,
    target: i64,
) -> HandlerResult {
    let id = target.to_string();
    let args = [("id", id.as_str())];

    let message = match action {
        UserAction::Delete => {
            if ctx.store.delete_user_cascade(target).await? {
                info!(user_id = user.id, target_id = target, "User deleted by administrator");
                t_args("user-deleted", &args)
            } else {
                t_args("user-not-found", &args)
            }
        }
        UserAction::Ban if ctx.is_admin(target) => t("cannot-ban-admin"),
        UserAction::Ban => {
            ctx.store.set_banned(target, true).await?;
            info!(user_id = user.id, target_id = target, "User banned");
            t_args("user-banned", &args)
        }
        UserAction::Unban => {
            ctx.store.set_banned(target, false).await?;
            info!(user_id = user.id, target_id = target, "User unbanned");
            t_args("user-unbanned", &args)
        }
    };

    ctx.reply_with_menu(user.id, &message).await
}

pub async fn start_rename_category(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
) -> HandlerResult {
    let categories = ctx.store.list_categories().await?;
    if categories.is_empty() {
        return ctx.reply_with_menu(user.id, &t("no-categories")).await;
    }

    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let text = with_list(
        &t("choose-category-rename"),
        &ui_builder::format_category_names(&names),
    );
    let keyboard = number_keyboard(categories.len(), false, true);
    dialogue
        .update(ConversationState::SelectingCategoryToRename { categories })
        .await?;
    ctx.reply_with(user.id, &text, keyboard).await
}

pub async fn handle_rename_selection(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    categories: Vec<Category>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, categories.len()) else {
        return reprompt_selection(ctx, user, categories.len(), false).await;
    };
    let category = &categories[index];

    let prompt = t_args("enter-new-category-name", &[("name", category.name.as_str())]);
    dialogue
        .update(ConversationState::EnteringNewCategoryName {
            category_id: category.id,
            current_name: category.name.clone(),
        })
        .await?;
    ctx.reply_with(user.id, &prompt, back_keyboard()).await
}

/// Rename the chosen category. Invalid or already taken names re-prompt.
pub async fn handle_new_category_name(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    category_id: CategoryId,
    current_name: String,
    text: &str,
) -> HandlerResult {
    let new_name = match validate_category_name(text) {
        Ok(name) => name,
        Err(e) => return reprompt_category_name(ctx, user, &e).await,
    };

    let renamed = match ctx.store.rename_category(category_id, &new_name).await {
        Ok(renamed) => renamed,
        Err(CatalogError::InvalidName(e)) => return reprompt_category_name(ctx, user, &e).await,
        Err(e) if e.is_unique_violation() => {
            return ctx
                .reply_with(user.id, &t("category-name-taken"), back_keyboard())
                .await
        }
        Err(e) => return Err(e.into()),
    };
    reset_dialogue(dialogue).await?;

    if !renamed {
        return ctx.reply_with_menu(user.id, &t("category-not-found")).await;
    }

    info!(user_id = user.id, category_id, old = %current_name, new = %new_name, "Category renamed");
    let text = t_args(
        "category-renamed",
        &[("old", current_name.as_str()), ("new", new_name.as_str())],
    );
    ctx.reply_with_menu(user.id, &text).await
}

/// Show every product as a numbered list and enter `next`
async fn start_product_pick(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    header: &str,
    next: fn(Vec<ProductEntry>) -> ConversationState,
) -> HandlerResult {
    let products = ctx.store.list_all_products_with_category().await?;
    if products.is_empty() {
        return ctx.reply_with_menu(user.id, &t("no-products")).await;
    }

    let text = with_list(&t(header), &ui_builder::format_product_entries(&products));
    let keyboard = number_keyboard(products.len(), false, true);
    dialogue.update(next(products)).await?;
    ctx.reply_with(user.id, &text, keyboard).await
}

pub async fn start_move_product(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
) -> HandlerResult {
    start_product_pick(ctx, dialogue, user, "choose-product-move", |products| {
        ConversationState::SelectingProductToMove { products }
    })
    .await
}

pub async fn handle_move_selection(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    products: Vec<ProductEntry>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, products.len()) else {
        return reprompt_selection(ctx, user, products.len(), false).await;
    };
    let product = &products[index];

    let categories = ctx.store.list_categories().await?;
    if categories.is_empty() {
        reset_dialogue(dialogue).await?;
        return ctx.reply_with_menu(user.id, &t("no-categories")).await;
    }

    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let text = with_list(
        &t_args("choose-target-category", &[("name", product.name.as_str())]),
        &ui_builder::format_category_names(&names),
    );
    let keyboard = number_keyboard(categories.len(), false, true);
    dialogue
        .update(ConversationState::SelectingNewCategoryForProduct {
            product_id: product.id,
            categories,
        })
        .await?;
    ctx.reply_with(user.id, &text, keyboard).await
}

pub async fn handle_move_target(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    product_id: ProductId,
    categories: Vec<Category>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, categories.len()) else {
        return reprompt_selection(ctx, user, categories.len(), false).await;
    };

    let moved = ctx
        .store
        .move_product(product_id, categories[index].id)
        .await?;
    reset_dialogue(dialogue).await?;

    let key = if moved { "product-moved" } else { "product-not-found" };
    ctx.reply_with_menu(user.id, &t(key)).await
}

pub async fn start_delete_product(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
) -> HandlerResult {
    start_product_pick(ctx, dialogue, user, "choose-product-delete", |products| {
        ConversationState::SelectingProductToDelete { products }
    })
    .await
}

pub async fn handle_delete_selection(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    products: Vec<ProductEntry>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, products.len()) else {
        return reprompt_selection(ctx, user, products.len(), false).await;
    };

    let deleted = ctx.store.delete_product(products[index].id).await?;
    reset_dialogue(dialogue).await?;

    let key = if deleted {
        "product-deleted"
    } else {
        "product-not-found"
    };
    ctx.reply_with_menu(user.id, &t(key)).await
}
