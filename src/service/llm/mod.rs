use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::LlmConfig,
    service::{session::Turn, ServiceError},
};

/// Text generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync + 'static {
    async fn complete(&self, system: &str, turns: &[Turn]) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Chat completions over an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        }
    }

    fn build_request<'a>(&'a self, system: &'a str, turns: &'a [Turn]) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
        messages.extend(turns.iter().map(|turn| ChatMessage {
            role: turn.role.as_str(),
            content: turn.content.as_str(),
        }));

        ChatRequest {
            model: &self.model,
            messages,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, turns: &[Turn]) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_request(system, turns))
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ServiceError::Llm("empty completion".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::session::Role;

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".into(),
            base_url: "https://example.invalid/v1/".into(),
            chat_model: "gpt-4o-mini".into(),
            tts_model: "tts-1".into(),
            tts_voice: "alloy".into(),
            stt_model: "whisper-1".into(),
        }
    }

    #[test]
    fn test_request_puts_system_first() {
        let client = OpenAiClient::new(Client::new(), &config());
        assert_eq!(client.base_url, "https://example.invalid/v1");

        let turns = vec![
            Turn {
                role: Role::Assistant,
                content: "Where do you live?".into(),
            },
            Turn {
                role: Role::User,
                content: "In Kazan".into(),
            },
        ];
        let request = client.build_request("be nice", &turns);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "In Kazan");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello!  "}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("  Hello!  "));
    }
}
