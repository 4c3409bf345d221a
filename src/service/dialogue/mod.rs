use std::sync::Arc;

use crate::service::{
    llm::LlmClient,
    profile::{Language, Level, Style},
    retry::RetryPolicy,
    session::{Role, Session, Turn},
    speech::{SpeechToText, TextToSpeech, VoiceParams},
};

/// Builds model prompts from session state and talks to the model and speech
/// backends. Every call is retried and degrades to `None` instead of failing.
#[derive(Clone)]
pub struct DialogueService {
    llm: Arc<dyn LlmClient>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    retry: RetryPolicy,
}

pub fn system_prompt(target: Language, level: Level, style: Style) -> String {
    let register = match style {
        Style::Casual => "Keep a relaxed, friendly tone, like chatting with a friend.",
        Style::Business => "Keep a polite, professional tone, as in a work conversation.",
    };
    let complexity = if level.is_beginner() {
        "Use short, simple sentences and common words."
    } else {
        "Use natural sentences suited to the learner's level."
    };

    format!(
        "You are a conversation partner helping a learner practise {lang} at CEFR level {level}. \
         Always answer in {lang}. {register} {complexity} \
         If the learner makes a mistake, briefly show the corrected phrase, then keep the conversation going \
         with one follow-up question.",
        lang = target.name(),
        level = level.as_str(),
    )
}

fn translation_prompt(into: Language) -> String {
    format!(
        "Translate the user's message into {}. Reply with the translation only.",
        into.name()
    )
}

impl DialogueService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        retry: RetryPolicy,
    ) -> Self {
        Self { llm, stt, tts, retry }
    }

    /// Generates the next assistant turn. History is only touched on success.
    pub async fn respond(&self, session: &mut Session, user_text: &str) -> Option<String> {
        let system = system_prompt(
            session.target_lang.unwrap_or(Language::English),
            session.level.unwrap_or(Level::A2),
            session.style.unwrap_or(Style::Casual),
        );

        let mut turns = session.history.to_vec();
        turns.push(Turn {
            role: Role::User,
            content: user_text.to_string(),
        });

        let reply = self
            .retry
            .run("Model reply", || self.llm.complete(&system, &turns))
            .await
            .ok()?;

        session.history.push(Role::User, user_text);
        session.history.push(Role::Assistant, reply.clone());
        session.last_assistant_text = Some(reply.clone());
        debug!("Chat {} history holds {} turns", session.chat_id, session.history.len());

        Some(reply)
    }

    /// Translates the latest assistant turn into the interface language.
    pub async fn translate_last(&self, session: &Session) -> Option<String> {
        let text = session.last_assistant_text.as_deref()?;
        let system = translation_prompt(session.interface_lang.unwrap_or(Language::English));
        let turns = [Turn {
            role: Role::User,
            content: text.to_string(),
        }];

        self.retry
            .run("Translation", || self.llm.complete(&system, &turns))
            .await
            .ok()
    }

    pub async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Option<String> {
        let text = self
            .retry
            .run("Transcription", || self.stt.transcribe(audio.clone(), file_name))
            .await
            .ok()?;

        if text.trim().is_empty() {
            debug!("Transcription of {} was empty", file_name);
            return None;
        }
        Some(text)
    }

    pub async fn synthesize(&self, text: &str, level: Level) -> Option<Vec<u8>> {
        let params = VoiceParams::for_level(level);
        let audio = self
            .retry
            .run("Speech synthesis", || self.tts.synthesize(text, params))
            .await
            .ok()?;

        if audio.is_empty() {
            warn!("Speech synthesis returned no audio");
            return None;
        }
        Some(audio)
    }
}
