mod conversation;

use chrono::Utc;
use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    prelude::*,
    types::Message,
};

use crate::{
    error::HandlerResult,
    service::onboarding::{OnboardingInput, OnboardingStage},
    state::AppState,
};

use super::{chat_locale, onboarding::render_step, report_failure, user_key};

fn is_command_text(msg: Message) -> bool {
    msg.text().is_some_and(|text| text.trim_start().starts_with('/'))
}

async fn handle_message_unknown_command(bot: Bot, msg: Message, state: AppState) -> HandlerResult<()> {
    let locale = chat_locale(&state, msg.chat.id);
    let result = bot
        .send_message(msg.chat.id, t!("commands.unknown_command", locale = locale))
        .await
        .map(|_| ())
        .map_err(Into::into);
    report_failure(&bot, &state, msg.chat.id, result).await
}

async fn route_message(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let mut session = registry.session.load(msg.chat.id.0, user_id).await;

    match session.onboarding_stage {
        OnboardingStage::Complete => conversation::handle_conversation(bot, state, msg, session).await,

        // Promo entry is typed and never metered.
        OnboardingStage::AwaitingPromo => match msg.text() {
            Some(text) => {
                let step = registry
                    .onboarding
                    .advance(&mut session, OnboardingInput::Promo(text.to_string()), Utc::now())
                    .await;
                registry.session.save(&session);
                render_step(bot, state, msg.chat.id, session.locale(), step).await
            }
            None => {
                let step = registry.onboarding.current_prompt(&session, Utc::now()).await;
                render_step(bot, state, msg.chat.id, session.locale(), step).await
            }
        },

        // Every other stage is answered with buttons; repeat the question.
        stage => {
            debug!("Chat {} typed during stage {}, repeating prompt", msg.chat.id, stage);
            let step = registry.onboarding.current_prompt(&session, Utc::now()).await;
            render_step(bot, state, msg.chat.id, session.locale(), step).await
        }
    }
}

async fn handle_message(bot: Bot, msg: Message, state: AppState) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }

    let result = route_message(&bot, &state, &msg, user_key(user.id)).await;
    report_failure(&bot, &state, msg.chat.id, result).await
}

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .branch(dptree::filter(is_command_text).endpoint(handle_message_unknown_command))
        .branch(dptree::endpoint(handle_message))
}
