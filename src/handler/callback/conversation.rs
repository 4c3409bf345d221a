use teloxide::{prelude::*, types::ChatId};

use crate::{error::HandlerResult, service::session::Session, state::AppState};

/// Translation is free: it never goes through the usage gate.
pub async fn handle_translate(bot: &Bot, state: &AppState, chat_id: ChatId, session: Session) -> HandlerResult<()> {
    let locale = session.locale();

    let text = match state.service_registry.dialogue.translate_last(&session).await {
        Some(translation) => translation,
        None if session.last_assistant_text.is_none() => t!("translate.nothing", locale = locale).to_string(),
        None => t!("translate.unavailable", locale = locale).to_string(),
    };

    bot.send_message(chat_id, text).await?;
    Ok(())
}
