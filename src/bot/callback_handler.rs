//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, info, warn};

use super::ui_builder::{parse_photo_token, photo_caption};
use super::{BotContext, ChatUser, HandlerResult};
use crate::catalog;
use crate::localization::t;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> HandlerResult {
    debug!(user_id = %q.from.id, "Received callback query from user");

    // Stop the client-side spinner regardless of what happens next
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    let user = ChatUser::new(q.from.id.0 as i64, q.from.full_name());
    let token = q.data.as_deref().unwrap_or_default();
    handle_callback(&ctx, &user, token).await
}

/// Transport-independent callback handling. Only the "show photo" action is
/// known; anything else is an invalid request.
pub async fn handle_callback(ctx: &BotContext, user: &ChatUser, token: &str) -> HandlerResult {
    if catalog::is_banned(ctx.store.as_ref(), ctx.admin_id, user.id).await {
        info!(user_id = user.id, "Denied callback to banned user");
        return ctx.reply(user.id, &t("access-denied")).await;
    }

    let Some(product_id) = parse_photo_token(token) else {
        debug!(user_id = user.id, token, "Unknown callback token");
        return ctx.reply(user.id, &t("invalid-request")).await;
    };

    let product = match ctx.store.get_product(product_id).await {
        Ok(product) => product,
        Err(e) => {
            error!(user_id = user.id, product_id, error = %e, "Failed to load product for photo");
            return ctx.reply(user.id, &t("photo-load-failed")).await;
        }
    };

    let Some((product, photo_ref)) =
        product.and_then(|p| p.photo_ref.clone().map(|photo| (p, photo)))
    else {
        return ctx.reply(user.id, &t("photo-not-found")).await;
    };

    let caption = photo_caption(&product);
    if let Err(e) = ctx.transport.send_photo(user.id, &photo_ref, &caption).await {
        error!(user_id = user.id, product_id, error = %e, "Failed to send product photo");
        return ctx.reply(user.id, &t("photo-load-failed")).await;
    }

    debug!(user_id = user.id, product_id, "Product photo sent");
    Ok(())
}
