mod callback;
mod command;
mod keyboard;
mod message;
mod onboarding;
mod payment;

use callback::get_callback_handler;
use command::get_command_handler;
use message::get_message_handler;
use payment::get_payment_handler;
use teloxide::{
    dispatching::UpdateHandler,
    dptree,
    prelude::Requester,
    types::{ChatId, UserId},
    Bot,
};

use crate::{
    error::HandlerResult,
    service::session::{ReplyMode, Session},
    state::AppState,
};

pub fn get_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(get_payment_handler())
        .branch(get_command_handler())
        .branch(get_callback_handler())
        .branch(get_message_handler())
}

/// Interface locale of a chat, without touching storage.
fn chat_locale(state: &AppState, chat_id: ChatId) -> &'static str {
    state
        .service_registry
        .session
        .peek(chat_id.0)
        .map(|session| session.locale())
        .unwrap_or("en")
}

fn user_key(user_id: UserId) -> i64 {
    user_id.0 as i64
}

async fn toggle_reply_mode(bot: &Bot, state: &AppState, chat_id: ChatId, mut session: Session) -> HandlerResult<()> {
    session.mode = session.mode.toggled();
    state.service_registry.session.save(&session);

    let key = match session.mode {
        ReplyMode::Text => "mode.text",
        ReplyMode::Voice => "mode.voice",
    };
    bot.send_message(chat_id, t!(key, locale = session.locale())).await?;
    Ok(())
}

/// Last stop for endpoint failures: log them and tell the user something went
/// wrong instead of leaving the chat silent.
async fn report_failure(bot: &Bot, state: &AppState, chat_id: ChatId, result: HandlerResult<()>) -> HandlerResult<()> {
    if let Err(e) = result {
        error!("Failed to handle update in chat {}: {}", chat_id, e);

        let locale = chat_locale(state, chat_id);
        if let Err(e) = bot.send_message(chat_id, t!("errors.generic", locale = locale)).await {
            error!("Failed to report error to chat {}: {}", chat_id, e);
        }
    }

    Ok(())
}
