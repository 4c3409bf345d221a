use chrono::Utc;
use teloxide::{
    dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::Message,
    Bot,
};

use crate::{
    command::Command,
    error::HandlerResult,
    service::{
        entitlement::PromoOutcome,
        onboarding::{OnboardingInput, OnboardingStage},
    },
    state::AppState,
};

use super::{onboarding::render_step, report_failure, toggle_reply_mode, user_key};

async fn handle_start(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let registry = &state.service_registry;

    let mut session = registry.session.load(msg.chat.id.0, user_id).await;
    let step = registry.onboarding.start(&mut session);
    registry.session.save(&session);

    render_step(bot, state, msg.chat.id, session.locale(), step).await
}

/// Activates a code outside onboarding. Inside the promo stage the code is fed
/// to onboarding instead so the flow moves on.
async fn handle_promo(bot: &Bot, state: &AppState, msg: &Message, user_id: i64, code: &str) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let now = Utc::now();

    let mut session = registry.session.load(msg.chat.id.0, user_id).await;
    let locale = session.locale();

    if code.trim().is_empty() {
        bot.send_message(msg.chat.id, t!("promo.usage", locale = locale)).await?;
        return Ok(());
    }

    if session.onboarding_stage == OnboardingStage::AwaitingPromo {
        let step = registry
            .onboarding
            .advance(&mut session, OnboardingInput::Promo(code.to_string()), now)
            .await;
        registry.session.save(&session);
        return render_step(bot, state, msg.chat.id, locale, step).await;
    }

    let text = match registry.entitlement.activate_promo(user_id, code, now).await {
        Ok(PromoOutcome::Activated(promo_type)) => {
            t!(format!("promo.activated.{}", promo_type.as_str()), locale = locale)
        }
        Ok(PromoOutcome::Invalid) => t!("promo.invalid", locale = locale),
        Ok(PromoOutcome::AlreadyUsed) => t!("promo.already_used", locale = locale),
        Err(e) => {
            error!("Promo activation failed for user {}: {}", user_id, e);
            t!("promo.unavailable", locale = locale)
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_mode(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let session = state.service_registry.session.load(msg.chat.id.0, user_id).await;
    toggle_reply_mode(bot, state, msg.chat.id, session).await
}

async fn handle_status(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let now = Utc::now();

    let session = registry.session.load(msg.chat.id.0, user_id).await;
    let locale = session.locale();

    let status = registry.entitlement.status(user_id, now).await?;

    let mut lines = Vec::new();

    if let Some(until) = status.premium_until {
        lines.push(t!("status.premium", locale = locale, until = until.format("%Y-%m-%d")));
    }

    if let Some(promo) = &status.promo {
        let promo_type = t!(format!("status.promo_types.{}", promo.promo_type.as_str()), locale = locale);
        let line = match (promo.valid, promo.valid_until) {
            (true, Some(until)) => t!(
                "status.promo_until",
                locale = locale,
                promo_type = promo_type,
                until = until.format("%Y-%m-%d")
            ),
            (true, None) => t!("status.promo_active", locale = locale, promo_type = promo_type),
            (false, _) => t!("status.promo_expired", locale = locale, promo_type = promo_type),
        };
        lines.push(line);
    }

    match registry.gate.remaining_today(user_id, now).await {
        Some(remaining) => lines.push(t!(
            "status.free_remaining",
            locale = locale,
            remaining = remaining,
            limit = registry.gate.daily_limit()
        )),
        None => lines.push(t!("status.unlimited", locale = locale)),
    }

    bot.send_message(msg.chat.id, lines.join("\n")).await?;
    Ok(())
}

async fn handle_forget(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let locale = super::chat_locale(state, msg.chat.id);

    registry.profile.erase(user_id).await?;
    registry.session.remove(msg.chat.id.0);

    bot.send_message(msg.chat.id, t!("forget.done", locale = locale)).await?;
    Ok(())
}

async fn handle_help(bot: &Bot, state: &AppState, msg: &Message) -> HandlerResult<()> {
    let locale = super::chat_locale(state, msg.chat.id);
    bot.send_message(
        msg.chat.id,
        t!(
            "commands.help",
            locale = locale,
            limit = state.service_registry.gate.daily_limit()
        ),
    )
    .await?;
    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: AppState) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user_key(user.id);

    debug!("Chat {} sent {:?}", msg.chat.id, cmd);

    let result = match &cmd {
        Command::Start => handle_start(&bot, &state, &msg, user_id).await,
        Command::Promo(code) => handle_promo(&bot, &state, &msg, user_id, code).await,
        Command::Mode => handle_mode(&bot, &state, &msg, user_id).await,
        Command::Status => handle_status(&bot, &state, &msg, user_id).await,
        Command::Forget => handle_forget(&bot, &state, &msg, user_id).await,
        Command::Help => handle_help(&bot, &state, &msg).await,
    };

    report_failure(&bot, &state, msg.chat.id, result).await
}

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command)
}
