use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{info, warn};

use gbot_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use gbot_core::{
    config::Config,
    messaging::port::MessagingPort,
    router::{CommandRouter, COMMANDS},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandRouter>,
    /// Our own username, for telling `/cmd@us` from `/cmd@otherbot`.
    pub bot_username: String,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    let me = bot.get_me().await?;
    info!(username = %me.username(), key_scheme = ?cfg.key_scheme, "logged in");

    match bot.set_my_commands(bot_commands()).await {
        Ok(_) => info!(count = COMMANDS.len(), "registered bot commands"),
        Err(e) => warn!(error = %e, "failed to register bot commands"),
    }

    // Wrap the raw Telegram messenger with a throttling decorator to reduce 429s when
    // several edits land at once. We still keep a 429 RetryAfter retry at the adapter layer.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState {
        bot_username: me.username().to_string(),
        commands: Arc::new(CommandRouter::new(
            cfg.key_scheme,
            messenger,
            cfg.ack_delete_after,
        )),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    info!("dispatcher stopped");
    Ok(())
}

fn bot_commands() -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect()
}
