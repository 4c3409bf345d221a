use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::LlmConfig,
    service::{profile::Level, ServiceError},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub speed: f32,
}

impl VoiceParams {
    /// Beginners hear slower speech.
    pub fn for_level(level: Level) -> Self {
        Self {
            speed: if level.is_beginner() { 0.85 } else { 1.0 },
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self { speed: 1.0 }
    }
}

/// An empty transcript means nothing usable was heard.
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, ServiceError>;
}

/// Returns encoded audio; empty bytes mean synthesis is unavailable.
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    async fn synthesize(&self, text: &str, params: VoiceParams) -> Result<Vec<u8>, ServiceError>;
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

/// Whisper transcription and TTS over the OpenAI-compatible audio endpoints.
#[derive(Clone)]
pub struct OpenAiSpeech {
    client: Client,
    base_url: String,
    api_key: String,
    stt_model: String,
    tts_model: String,
    tts_voice: String,
}

impl OpenAiSpeech {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            stt_model: config.stt_model.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
        }
    }
}

#[async_trait]
impl SpeechToText for OpenAiSpeech {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, ServiceError> {
        let file = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/ogg")?;
        let form = Form::new().text("model", self.stt_model.clone()).part("file", file);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<TranscriptionResponse>()
            .await?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str, params: VoiceParams) -> Result<Vec<u8>, ServiceError> {
        let request = SpeechRequest {
            model: &self.tts_model,
            input: text,
            voice: &self.tts_voice,
            response_format: "opus",
            speed: params.speed,
        };

        let bytes = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(bytes.to_vec())
    }
}
