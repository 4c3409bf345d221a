use chrono::Utc;
use teloxide::{
    net::Download,
    payloads::{SendMessageSetters, SendVoiceSetters},
    prelude::*,
    types::{ChatAction, InputFile, Message},
};

use crate::{
    error::HandlerResult,
    handler::keyboard::get_reply_keyboard,
    service::{
        profile::Level,
        session::{ReplyMode, Session},
        usage::{GateDecision, InboundMessage},
    },
    state::AppState,
};

/// Downloads the voice or audio payload of a message, if it has one.
async fn download_audio(bot: &Bot, msg: &Message) -> HandlerResult<Option<(Vec<u8>, String)>> {
    let (file_id, file_name) = if let Some(voice) = msg.voice() {
        (voice.file.id.clone(), "voice.ogg".to_string())
    } else if let Some(audio) = msg.audio() {
        (
            audio.file.id.clone(),
            audio.file_name.clone().unwrap_or_else(|| "audio.ogg".to_string()),
        )
    } else {
        return Ok(None);
    };

    let file = bot.get_file(file_id).await?;
    let mut buffer = Vec::with_capacity(file.size as usize);
    bot.download_file(&file.path, &mut buffer).await?;

    Ok(Some((buffer, file_name)))
}

/// Telegram rejects longer voice captions.
const CAPTION_LIMIT: usize = 1024;

fn voice_caption(reply: &str) -> Option<&str> {
    (reply.chars().count() <= CAPTION_LIMIT).then_some(reply)
}

async fn send_reply(bot: &Bot, state: &AppState, msg: &Message, session: &Session, reply: String) -> HandlerResult<()> {
    let locale = session.locale();

    if session.mode == ReplyMode::Voice {
        let level = session.level.unwrap_or(Level::A2);
        if let Some(audio) = state.service_registry.dialogue.synthesize(&reply, level).await {
            let request = bot.send_voice(msg.chat.id, InputFile::memory(audio).file_name("reply.ogg"));
            let sent = match voice_caption(&reply) {
                Some(caption) => request
                    .caption(caption)
                    .reply_markup(get_reply_keyboard(locale))
                    .await
                    .map(|_| true),
                None => request.await.map(|_| false),
            };

            match sent {
                Ok(true) => return Ok(()),
                Ok(false) => debug!("Reply too long for a caption in chat {}", msg.chat.id),
                Err(e) => warn!("Failed to send voice reply in chat {}: {}", msg.chat.id, e),
            }
        } else {
            info!("Falling back to a text reply in chat {}", msg.chat.id);
        }
    }

    bot.send_message(msg.chat.id, reply)
        .reply_markup(get_reply_keyboard(locale))
        .await?;
    Ok(())
}

/// Metered dialogue turn for an onboarded chat.
pub async fn handle_conversation(bot: &Bot, state: &AppState, msg: &Message, mut session: Session) -> HandlerResult<()> {
    let registry = &state.service_registry;
    let locale = session.locale();
    let user_id = session.user_id;

    if !InboundMessage::from(msg).is_countable() {
        bot.send_message(msg.chat.id, t!("messages.unsupported", locale = locale))
            .await?;
        return Ok(());
    }

    let decision = registry.gate.check(user_id, Utc::now()).await;
    if decision == GateDecision::Halt {
        bot.send_message(
            msg.chat.id,
            t!("usage.limit_reached", locale = locale, limit = registry.gate.daily_limit()),
        )
        .await?;
        return Ok(());
    }

    if let GateDecision::Counted { remind: true, .. } = decision {
        let reminder = t!(
            "usage.reminder",
            locale = locale,
            remaining = registry.gate.remaining_at_reminder()
        );
        if let Err(e) = bot.send_message(msg.chat.id, reminder).await {
            warn!("Failed to send usage reminder in chat {}: {}", msg.chat.id, e);
        }
    }

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        warn!("Failed to send typing action in chat {}: {}", msg.chat.id, e);
    }

    let user_text = match msg.text() {
        Some(text) => text.to_string(),
        None => {
            let Some((audio, file_name)) = download_audio(bot, msg).await? else {
                return Ok(());
            };
            match registry.dialogue.transcribe(audio, &file_name).await {
                Some(text) => text,
                None => {
                    bot.send_message(msg.chat.id, t!("voice.not_recognized", locale = locale))
                        .await?;
                    return Ok(());
                }
            }
        }
    };

    match registry.dialogue.respond(&mut session, &user_text).await {
        Some(reply) => {
            let session = registry.session.commit_dialogue(&session);
            send_reply(bot, state, msg, &session, reply).await?;
        }
        None => {
            bot.send_message(msg.chat.id, t!("errors.model_unavailable", locale = locale))
                .await?;
        }
    }

    Ok(())
}
