use chrono::Utc;
use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    prelude::*,
    types::Message,
};

use crate::{error::HandlerResult, state::AppState};

use super::{chat_locale, report_failure, user_key};

fn is_successful_payment(msg: Message) -> bool {
    msg.successful_payment().is_some()
}

async fn book_payment(bot: &Bot, state: &AppState, msg: &Message, user_id: i64) -> HandlerResult<()> {
    let expires_at = state.service_registry.entitlement.extend_premium(user_id, Utc::now()).await?;

    let locale = chat_locale(state, msg.chat.id);
    bot.send_message(
        msg.chat.id,
        t!("payment.success", locale = locale, until = expires_at.format("%Y-%m-%d")),
    )
    .await?;
    Ok(())
}

/// Invoices are issued elsewhere; this only books the paid period.
async fn handle_successful_payment(bot: Bot, msg: Message, state: AppState) -> HandlerResult<()> {
    let Some(user) = msg.from.as_ref() else {
        warn!("Payment in chat {} without a payer", msg.chat.id);
        return Ok(());
    };
    let user_id = user_key(user.id);

    if let Some(payment) = msg.successful_payment() {
        info!("User {} paid {} {:?}", user_id, payment.total_amount, payment.currency);
    }

    let result = book_payment(&bot, &state, &msg, user_id).await;
    report_failure(&bot, &state, msg.chat.id, result).await
}

pub fn get_payment_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter(is_successful_payment)
        .endpoint(handle_successful_payment)
}
