mod conversation;

use std::str::FromStr;

use chrono::Utc;
use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::CallbackQuery,
};

use crate::{
    error::{BotError, HandlerResult},
    service::onboarding::{OnboardingInput, OnboardingStep},
    state::AppState,
};

use super::{onboarding::render_step, report_failure, toggle_reply_mode, user_key};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Language(String),
    SkipPromo,
    Acknowledge,
    TargetLanguage(String),
    Level(String),
    Style(String),
    ToggleMode,
    Translate,
}

impl FromStr for CallbackAction {
    type Err = BotError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let action = match data.split_once(':') {
            Some(("lang", value)) => CallbackAction::Language(value.to_string()),
            Some(("target", value)) => CallbackAction::TargetLanguage(value.to_string()),
            Some(("level", value)) => CallbackAction::Level(value.to_string()),
            Some(("style", value)) => CallbackAction::Style(value.to_string()),
            Some(("promo", "skip")) => CallbackAction::SkipPromo,
            Some(("mode", "toggle")) => CallbackAction::ToggleMode,
            None if data == "ok" => CallbackAction::Acknowledge,
            None if data == "translate" => CallbackAction::Translate,
            _ => return Err(BotError::InvalidUpdate(format!("Unknown callback data: {}", data))),
        };
        Ok(action)
    }
}

impl CallbackAction {
    /// Onboarding input carried by this button, if any.
    pub fn onboarding_input(&self) -> Option<OnboardingInput> {
        match self {
            CallbackAction::Language(code) => Some(OnboardingInput::Language(code.clone())),
            CallbackAction::SkipPromo => Some(OnboardingInput::Promo("no".into())),
            CallbackAction::Acknowledge => Some(OnboardingInput::Acknowledge),
            CallbackAction::TargetLanguage(code) => Some(OnboardingInput::TargetLanguage(code.clone())),
            CallbackAction::Level(level) => Some(OnboardingInput::Level(level.clone())),
            CallbackAction::Style(style) => Some(OnboardingInput::Style(style.clone())),
            CallbackAction::ToggleMode | CallbackAction::Translate => None,
        }
    }
}

async fn dispatch_action(bot: &Bot, state: &AppState, chat_id: ChatId, user_id: i64, action: CallbackAction) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let mut session = registry.session.load(chat_id.0, user_id).await;

    if let Some(input) = action.onboarding_input() {
        let step = registry.onboarding.advance(&mut session, input, Utc::now()).await;
        registry.session.save(&session);

        if let OnboardingStep::Ignored { stage } = &step {
            debug!("Stale button in chat {} (stage {})", chat_id, stage);
        }
        return render_step(bot, state, chat_id, session.locale(), step).await;
    }

    match action {
        CallbackAction::ToggleMode => toggle_reply_mode(bot, state, chat_id, session).await,
        CallbackAction::Translate => conversation::handle_translate(bot, state, chat_id, session).await,
        _ => Ok(()),
    }
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: AppState) -> HandlerResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.as_ref() else {
        warn!("Callback {} without a message", q.id);
        return Ok(());
    };
    let chat_id = message.chat().id;
    let user_id = user_key(q.from.id);

    let action = match q.data.as_deref().map(CallbackAction::from_str) {
        Some(Ok(action)) => action,
        Some(Err(e)) => {
            warn!("Ignoring callback from user {}: {}", user_id, e);
            return Ok(());
        }
        None => return Ok(()),
    };

    let result = dispatch_action(&bot, &state, chat_id, user_id, action).await;
    report_failure(&bot, &state, chat_id, result).await
}

pub fn get_callback_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_callback_query().endpoint(handle_callback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_data() {
        assert_eq!(
            "lang:ru".parse::<CallbackAction>().unwrap(),
            CallbackAction::Language("ru".into())
        );
        assert_eq!(
            "level:B1".parse::<CallbackAction>().unwrap(),
            CallbackAction::Level("B1".into())
        );
        assert_eq!("ok".parse::<CallbackAction>().unwrap(), CallbackAction::Acknowledge);
        assert_eq!("promo:skip".parse::<CallbackAction>().unwrap(), CallbackAction::SkipPromo);
        assert_eq!("mode:toggle".parse::<CallbackAction>().unwrap(), CallbackAction::ToggleMode);
        assert_eq!("translate".parse::<CallbackAction>().unwrap(), CallbackAction::Translate);
        assert!("download:now".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_skip_button_is_a_refusal() {
        assert_eq!(
            CallbackAction::SkipPromo.onboarding_input(),
            Some(OnboardingInput::Promo("no".into()))
        );
        assert_eq!(CallbackAction::Translate.onboarding_input(), None);
    }
}
