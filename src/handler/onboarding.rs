use teloxide::{payloads::SendMessageSetters, prelude::Requester, types::ChatId, Bot};

use crate::{
    error::HandlerResult,
    service::onboarding::{OnboardingStep, PromoRejection},
    state::AppState,
};

use super::keyboard::{
    get_acknowledge_keyboard, get_interface_language_keyboard, get_level_keyboard, get_promo_skip_keyboard,
    get_reply_keyboard, get_style_keyboard, get_target_language_keyboard,
};

/// Sends the prompt that goes with an onboarding step.
pub async fn render_step(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    locale: &str,
    step: OnboardingStep,
) -> HandlerResult<()> {
    match step {
        OnboardingStep::AskLanguage => {
            bot.send_message(chat_id, t!("onboarding.ask_language", locale = "en"))
                .reply_markup(get_interface_language_keyboard())
                .await?;
        }

        OnboardingStep::AskPromo => {
            bot.send_message(chat_id, t!("onboarding.ask_promo", locale = locale))
                .reply_markup(get_promo_skip_keyboard(locale))
                .await?;
        }

        OnboardingStep::PromoRejected(rejection) => {
            let key = match rejection {
                PromoRejection::Invalid => "promo.invalid",
                PromoRejection::AlreadyUsed => "promo.already_used",
                PromoRejection::Unavailable => "promo.unavailable",
            };
            bot.send_message(chat_id, t!(key, locale = locale))
                .reply_markup(get_promo_skip_keyboard(locale))
                .await?;
        }

        OnboardingStep::AskAcknowledge { promo } => {
            if let Some(promo_type) = promo {
                bot.send_message(
                    chat_id,
                    t!(format!("promo.activated.{}", promo_type.as_str()), locale = locale),
                )
                .await?;
            }
            bot.send_message(
                chat_id,
                t!(
                    "onboarding.intro",
                    locale = locale,
                    limit = state.service_registry.gate.daily_limit()
                ),
            )
            .reply_markup(get_acknowledge_keyboard(locale))
            .await?;
        }

        OnboardingStep::AskTargetLanguage { english_only } => {
            let key = if english_only {
                "onboarding.ask_target_english_only"
            } else {
                "onboarding.ask_target"
            };
            bot.send_message(chat_id, t!(key, locale = locale))
                .reply_markup(get_target_language_keyboard(locale, english_only))
                .await?;
        }

        OnboardingStep::AskLevel { target_lang } => {
            let language = t!(format!("languages.{}", target_lang.code()), locale = locale);
            bot.send_message(chat_id, t!("onboarding.ask_level", locale = locale, language = language))
                .reply_markup(get_level_keyboard())
                .await?;
        }

        OnboardingStep::AskStyle { .. } => {
            bot.send_message(chat_id, t!("onboarding.ask_style", locale = locale))
                .reply_markup(get_style_keyboard(locale))
                .await?;
        }

        OnboardingStep::Completed { opening_question, .. } => {
            bot.send_message(chat_id, t!("onboarding.complete", locale = locale))
                .await?;
            bot.send_message(chat_id, opening_question)
                .reply_markup(get_reply_keyboard(locale))
                .await?;
        }

        OnboardingStep::Ignored { stage } => {
            debug!("Nothing to render for ignored input in stage {}", stage);
        }
    }

    Ok(())
}
