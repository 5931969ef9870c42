//! Dialogue Manager module for the user-facing dialog steps
//!
//! Adding a product, browsing by rating, editing one's own products and the
//! small idle actions (help, notification toggle). Every step either advances
//! the conversation state, re-prompts and leaves it untouched, or finishes and
//! clears it.

use tracing::{debug, info, warn};

use super::ui_builder::{
    self, back_keyboard, edit_field_keyboard, number_keyboard, rating_keyboard, with_list,
    EDIT_NAME, EDIT_PHOTO, OTHER,
};
use super::{BotContext, ChatUser, HandlerResult};
use crate::catalog;
use crate::dialogue::{
    parse_selection, reset_dialogue, validate_category_name, validate_product_name,
    CatalogDialogue, CategoryPurpose, ConversationState,
};
use crate::errors::{CatalogError, NameError};
use crate::localization::{t, t_args};
use crate::models::{Category, CategoryId, NewProduct, ProductEntry, ProductId, Rating};
use crate::notifications::{self, ProductNotice};

pub async fn send_welcome(ctx: &BotContext, user: &ChatUser) -> HandlerResult {
    let text = t_args("welcome", &[("name", user.display_name.as_str())]);
    ctx.reply_with_menu(user.id, &text).await
}

pub async fn send_help(ctx: &BotContext, user: &ChatUser) -> HandlerResult {
    let mut text = t("help-text");
    if ctx.is_admin(user.id) {
        text.push_str("\n\n");
        text.push_str(&t("help-admin"));
    }
    ctx.reply_with_menu(user.id, &text).await
}

pub async fn toggle_notifications(ctx: &BotContext, user: &ChatUser) -> HandlerResult {
    let enabled = catalog::toggle_notifications(ctx.store.as_ref(), user.id).await;
    info!(user_id = user.id, enabled, "Notifications toggled");

    let key = if enabled {
        "notifications-enabled"
    } else {
        "notifications-disabled"
    };
    ctx.reply_with(user.id, &t(key), ui_builder::main_menu_keyboard(enabled))
        .await
}

fn name_error_message(error: &NameError, product: bool) -> String {
    match (error, product) {
        (NameError::Empty, false) => t("category-name-empty"),
        (NameError::Empty, true) => t("product-name-empty"),
        (NameError::Reserved(name), _) => {
            t_args("category-name-reserved", &[("name", name.as_str())])
        }
        (NameError::TooLong { max }, false) => {
            t_args("category-name-too-long", &[("max", max.to_string().as_str())])
        }
        (NameError::TooLong { max }, true) => {
            t_args("product-name-too-long", &[("max", max.to_string().as_str())])
        }
    }
}

pub(crate) async fn reprompt_category_name(
    ctx: &BotContext,
    user: &ChatUser,
    error: &NameError,
) -> HandlerResult {
    debug!(user_id = user.id, error = %error, "Rejected category name");
    ctx.reply_with(user.id, &name_error_message(error, false), back_keyboard())
        .await
}

async fn reprompt_product_name(
    ctx: &BotContext,
    user: &ChatUser,
    error: &NameError,
) -> HandlerResult {
    debug!(user_id = user.id, error = %error, "Rejected product name");
    ctx.reply_with(user.id, &name_error_message(error, true), back_keyboard())
        .await
}

/// Re-prompt for a number in `[1, len]`, keeping the current keyboard shape
pub(crate) async fn reprompt_selection(
    ctx: &BotContext,
    user: &ChatUser,
    len: usize,
    show_other: bool,
) -> HandlerResult {
    let text = t_args("invalid-selection", &[("max", len.to_string().as_str())]);
    ctx.reply_with(user.id, &text, number_keyboard(len, show_other, true))
        .await
}

/// Show the category picker and enter `ChoosingCategory`.
///
/// Adding always offers "Other" so the first category can be created. Browsing
/// with no categories at all stays idle.
pub async fn start_category_choice(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    purpose: CategoryPurpose,
) -> HandlerResult {
    let (header, rating_filter) = match purpose {
        CategoryPurpose::Add => (t("choose-category-add"), None),
        CategoryPurpose::View(Rating::Recommend) => {
            (t("choose-category-recommended"), Some(Rating::Recommend))
        }
        CategoryPurpose::View(Rating::Avoid) => (t("choose-category-avoided"), Some(Rating::Avoid)),
    };

    let summaries = ctx.store.category_summaries(rating_filter).await?;

    if summaries.is_empty() && purpose != CategoryPurpose::Add {
        return ctx.reply_with_menu(user.id, &t("no-categories")).await;
    }

    let body = if summaries.is_empty() {
        t("no-categories")
    } else {
        ui_builder::format_category_summaries(&summaries)
    };
    let show_other = purpose == CategoryPurpose::Add;
    let keyboard = number_keyboard(summaries.len(), show_other, true);
    let categories: Vec<Category> = summaries.iter().map(Category::from).collect();

    dialogue
        .update(ConversationState::ChoosingCategory {
            purpose,
            categories,
        })
        .await?;
    ctx.reply_with(user.id, &with_list(&header, &body), keyboard)
        .await
}

pub async fn handle_category_choice(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    purpose: CategoryPurpose,
    categories: Vec<Category>,
    text: &str,
) -> HandlerResult {
    let adding = purpose == CategoryPurpose::Add;

    if adding && text == OTHER {
        dialogue.update(ConversationState::AddingCategory).await?;
        return ctx
            .reply_with(user.id, &t("enter-category-name"), back_keyboard())
            .await;
    }

    let Some(index) = parse_selection(text, categories.len()) else {
        return reprompt_selection(ctx, user, categories.len(), adding).await;
    };
    let category = &categories[index];

    match purpose {
        CategoryPurpose::Add => {
            debug!(user_id = user.id, category_id = category.id, "Category chosen for new product");
            dialogue
                .update(ConversationState::AwaitingProductName {
                    category_id: category.id,
                    photo_ref: None,
                })
                .await?;
            ctx.reply_with(user.id, &t("enter-product-name"), back_keyboard())
                .await
        }
        CategoryPurpose::View(rating) => {
            reset_dialogue(dialogue).await?;
            send_products(ctx, user, category, rating).await
        }
    }
}

/// Send every product of `category` with `rating`, then the main menu
async fn send_products(
    ctx: &BotContext,
    user: &ChatUser,
    category: &Category,
    rating: Rating,
) -> HandlerResult {
    let products = ctx.store.query_products(category.id, rating).await?;
    debug!(
        user_id = user.id,
        category_id = category.id,
        count = products.len(),
        "Browsing products"
    );

    if products.is_empty() {
        return ctx.reply_with_menu(user.id, &t("products-empty")).await;
    }

    let header = t_args(
        "products-header",
        &[
            ("category", category.name.as_str()),
            ("rating", ui_builder::rating_label(rating)),
        ],
    );
    ctx.reply(user.id, &header).await?;

    for product in &products {
        let line = ui_builder::product_line(product);
        match ui_builder::photo_keyboard(product) {
            Some(keyboard) => ctx.reply_with(user.id, &line, keyboard).await?,
            None => ctx.reply(user.id, &line).await?,
        }
    }

    ctx.reply_with_menu(user.id, &t("main-menu-prompt")).await
}

/// Create (or reuse) a category typed by the user, then show the add picker
/// again so it can be selected
pub async fn handle_new_category_name(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    text: &str,
) -> HandlerResult {
    let name = match validate_category_name(text) {
        Ok(name) => name,
        Err(e) => return reprompt_category_name(ctx, user, &e).await,
    };

    let category_id = match ctx.store.add_category(&name).await {
        Ok(id) => id,
        Err(CatalogError::InvalidName(e)) => return reprompt_category_name(ctx, user, &e).await,
        Err(e) => return Err(e.into()),
    };
    info!(user_id = user.id, category_id, category = %name, "Category added by user");

    ctx.reply(user.id, &t_args("category-ready", &[("name", name.as_str())]))
        .await?;
    start_category_choice(ctx, dialogue, user, CategoryPurpose::Add).await
}

async fn advance_to_rating(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    category_id: CategoryId,
    product_name: String,
    photo_ref: Option<String>,
) -> HandlerResult {
    let prompt = t_args("choose-rating", &[("name", product_name.as_str())]);
    dialogue
        .update(ConversationState::AwaitingRating {
            category_id,
            product_name,
            photo_ref,
        })
        .await?;
    ctx.reply_with(user.id, &prompt, rating_keyboard()).await
}

pub async fn handle_product_name(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    category_id: CategoryId,
    photo_ref: Option<String>,
    text: &str,
) -> HandlerResult {
    match validate_product_name(text) {
        Ok(name) => advance_to_rating(ctx, dialogue, user, category_id, name, photo_ref).await,
        Err(e) => reprompt_product_name(ctx, user, &e).await,
    }
}

/// A photo while waiting for the product name. With a caption the caption is
/// the name; without one the photo is only buffered.
pub async fn handle_product_photo(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    category_id: CategoryId,
    photo_ref: String,
    caption: Option<String>,
) -> HandlerResult {
    let caption = caption.filter(|c| !c.trim().is_empty());

    if let Some(caption) = caption {
        match validate_product_name(&caption) {
            Ok(name) => {
                return advance_to_rating(ctx, dialogue, user, category_id, name, Some(photo_ref))
                    .await
            }
            Err(e) => {
                dialogue
                    .update(ConversationState::AwaitingProductName {
                        category_id,
                        photo_ref: Some(photo_ref),
                    })
                    .await?;
                return reprompt_product_name(ctx, user, &e).await;
            }
        }
    }

    debug!(user_id = user.id, "Buffered photo while waiting for product name");
    dialogue
        .update(ConversationState::AwaitingProductName {
            category_id,
            photo_ref: Some(photo_ref),
        })
        .await?;
    ctx.reply_with(user.id, &t("photo-buffered"), back_keyboard())
        .await
}

/// Persist the product, notify subscribers and return to the main menu
pub async fn handle_rating(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    category_id: CategoryId,
    product_name: String,
    photo_ref: Option<String>,
    text: &str,
) -> HandlerResult {
    let Some(rating) = ui_builder::parse_rating_label(text) else {
        return ctx
            .reply_with(user.id, &t("choose-rating-invalid"), rating_keyboard())
            .await;
    };

    let product = NewProduct {
        user_id: user.id,
        author_name: user.display_name.clone(),
        category_id,
        name: product_name,
        rating,
        photo_ref,
    };
    let product_id = ctx.store.save_product(&product).await?;
    reset_dialogue(dialogue).await?;
    info!(user_id = user.id, product_id, rating = %rating, "Product added");

    // The product is already saved, so a failed lookup only degrades the notice
    let category_name = match ctx.store.category_name(category_id).await {
        Ok(Some(name)) => name,
        Ok(None) => t("unknown-category"),
        Err(e) => {
            warn!(user_id = user.id, category_id, error = %e, "Failed to load category name");
            t("unknown-category")
        }
    };
    let notice = ProductNotice {
        author_id: user.id,
        author_name: &product.author_name,
        category_name: &category_name,
        product_name: &product.name,
        rating_label: ui_builder::rating_label(rating),
    };
    notifications::notify_new_product(ctx.store.as_ref(), ctx.transport.as_ref(), &notice).await;

    ctx.reply_with_menu(user.id, &t("product-saved")).await
}

/// Entry point of `/edit_product`: list the user's own products
pub async fn start_edit_product(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
) -> HandlerResult {
    let products = ctx.store.list_user_products(user.id).await?;
    if products.is_empty() {
        return ctx.reply_with_menu(user.id, &t("no-own-products")).await;
    }

    let text = with_list(
        &t("choose-product-edit"),
        &ui_builder::format_product_entries(&products),
    );
    let keyboard = number_keyboard(products.len(), false, true);
    dialogue
        .update(ConversationState::SelectingProductToEdit { products })
        .await?;
    ctx.reply_with(user.id, &text, keyboard).await
}

pub async fn handle_edit_selection(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    products: Vec<ProductEntry>,
    text: &str,
) -> HandlerResult {
    let Some(index) = parse_selection(text, products.len()) else {
        return reprompt_selection(ctx, user, products.len(), false).await;
    };

    dialogue
        .update(ConversationState::ChoosingEditField {
            product_id: products[index].id,
        })
        .await?;
    ctx.reply_with(user.id, &t("choose-edit-field"), edit_field_keyboard())
        .await
}

pub async fn handle_edit_field_choice(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    product_id: ProductId,
    text: &str,
) -> HandlerResult {
    let (next, prompt) = match text {
        EDIT_NAME => (
            ConversationState::EditingProductName { product_id },
            "enter-new-product-name",
        ),
        EDIT_PHOTO => (
            ConversationState::EditingProductPhoto { product_id },
            "send-new-photo",
        ),
        _ => {
            return ctx
                .reply_with(user.id, &t("choose-edit-field-invalid"), edit_field_keyboard())
                .await
        }
    };

    dialogue.update(next).await?;
    ctx.reply_with(user.id, &t(prompt), back_keyboard()).await
}

pub async fn handle_edited_name(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    product_id: ProductId,
    text: &str,
) -> HandlerResult {
    let name = match validate_product_name(text) {
        Ok(name) => name,
        Err(e) => return reprompt_product_name(ctx, user, &e).await,
    };

    let updated = ctx.store.rename_product(product_id, user.id, &name).await?;
    reset_dialogue(dialogue).await?;

    if updated {
        info!(user_id = user.id, product_id, "Product renamed by owner");
        ctx.reply_with_menu(user.id, &t("product-renamed")).await
    } else {
        ctx.reply_with_menu(user.id, &t("product-not-found")).await
    }
}

pub async fn handle_edited_photo(
    ctx: &BotContext,
    dialogue: &CatalogDialogue,
    user: &ChatUser,
    product_id: ProductId,
    photo_ref: &str,
) -> HandlerResult {
    let updated = ctx
        .store
        .set_product_photo(product_id, user.id, photo_ref)
        .await?;
    reset_dialogue(dialogue).await?;

    if updated {
        info!(user_id = user.id, product_id, "Product photo replaced by owner");
        ctx.reply_with_menu(user.id, &t("photo-updated")).await
    } else {
        ctx.reply_with_menu(user.id, &t("product-not-found")).await
    }
}
