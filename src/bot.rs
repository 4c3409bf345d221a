use teloxide::prelude::*;
use teloxide::Bot;

use crate::command;
use crate::error::HandlerResult;
use crate::handler::get_handler;
use crate::state::AppState;

pub struct BotService {
    pub bot: Bot,
    pub state: AppState,
}

impl BotService {
    pub fn new(state: AppState) -> Self {
        let bot = Bot::new(state.config.telegram.0.clone());
        Self { bot, state }
    }

    pub async fn start(&self) -> HandlerResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(me) => info!("Connected to Telegram API as @{}", me.username()),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        if let Err(e) = command::setup_user_commands(&self.bot).await {
            warn!("Failed to register bot commands: {}", e);
        }

        Dispatcher::builder(self.bot.clone(), get_handler())
            .dependencies(dptree::deps![self.state.clone()])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
