use teloxide::{
    macros::BotCommands,
    payloads::SetMyCommandsSetters,
    prelude::Requester,
    types::BotCommand,
    Bot,
};

use crate::error::HandlerResult;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Promo(String),
    Mode,
    Status,
    Forget,
    Help,
}

impl Command {
    pub fn user_commands(locale: &str) -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", t!("commands.description.start", locale = locale)),
            BotCommand::new("promo", t!("commands.description.promo", locale = locale)),
            BotCommand::new("mode", t!("commands.description.mode", locale = locale)),
            BotCommand::new("status", t!("commands.description.status", locale = locale)),
            BotCommand::new("forget", t!("commands.description.forget", locale = locale)),
            BotCommand::new("help", t!("commands.description.help", locale = locale)),
        ]
    }
}

/// Registers the command menu in English plus one localized menu per
/// interface language.
pub async fn setup_user_commands(bot: &Bot) -> HandlerResult<()> {
    bot.delete_my_commands().await?;
    bot.set_my_commands(Command::user_commands("en")).await?;
    bot.set_my_commands(Command::user_commands("ru"))
        .language_code("ru")
        .await?;
    Ok(())
}
