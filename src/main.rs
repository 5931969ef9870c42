use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use catalog_bot::bot::{self, BotContext, Command};
use catalog_bot::config::BotConfig;
use catalog_bot::db::{self, PgCatalog};
use catalog_bot::dialogue::ConversationStorage;
use catalog_bot::localization;
use catalog_bot::logging;
use catalog_bot::transport::TelegramTransport;

#[tokio::main]
async fn main() -> Result<()> {
    let config = BotConfig::from_env().context("Failed to load configuration")?;
    logging::init_tracing(config.log_format);
    localization::init_localization();

    info!(config = ?config, "Starting Catalog Telegram Bot");
    if config.admin_user_id == 0 {
        warn!("ADMIN_USER_ID is not set, administrator commands are disabled");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    db::init_database_schema(&pool).await?;

    let bot = Bot::new(config.bot_token.clone());

    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    let bot_username = me.username.clone().unwrap_or_default();

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let ctx = Arc::new(BotContext {
        store: Arc::new(PgCatalog::new(pool)),
        transport: Arc::new(TelegramTransport::new(bot.clone())),
        admin_id: config.admin_user_id,
        bot_username,
    });
    let storage = ConversationStorage::new();

    info!(bot = %ctx.bot_username, "Bot initialized, starting dispatcher");

    let mut dispatcher = Dispatcher::builder(bot.clone(), bot::schema())
        .dependencies(dptree::deps![ctx, storage])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            info!(url = %webhook.url, port = webhook.port, "Starting bot in webhook mode");
            let options = webhooks::Options::new(webhook.listen_addr(), webhook.url);
            let listener = webhooks::axum(bot, options)
                .await
                .context("Failed to start webhook listener")?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            info!("Starting bot in long polling mode");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
