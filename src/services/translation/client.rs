// Ollama chat client - one-shot translation requests against a local model
//
// The persona model is registered once at startup, derived from the
// configured base model with a fixed system prompt. Each translation is a
// stateless chat request: a fresh single-message list per call, so the
// service keeps no conversation memory between captures.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::TranslationConfig;
use crate::core::errors::{TranslationError, TranslationResult};
use crate::orchestration::Translator;

/// System prompt baked into the registered translation persona.
const PERSONA_SYSTEM_PROMPT: &str = "You are an embedded translation assistant. \
     The user is a program which gives you Japanese text. Your output will be a \
     correct, idiomatic translation of that text into English. Do not ask any \
     questions. The input may be a snippet or extract from a longer work. \
     Translate what you are given.";

pub struct TranslationClient {
    http_client: reqwest::Client,
    base_url: String,
    model_name: String,
    base_model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct CreateModelRequest<'a> {
    model: &'a str,
    from: &'a str,
    system: &'a str,
    stream: bool,
}

impl TranslationClient {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http_client,
            base_url: format!("http://{}:{}", config.host, config.port),
            model_name: config.model_name.clone(),
            base_model: config.base_model.clone(),
        })
    }

    /// Register the derived persona model with the service. Creating a model
    /// that already exists is an upsert on the Ollama side, so this is safe
    /// to run on every startup.
    pub async fn register_persona(&self) -> TranslationResult<()> {
        let url = format!("{}/api/create", self.base_url);
        let request = CreateModelRequest {
            model: &self.model_name,
            from: &self.base_model,
            system: PERSONA_SYSTEM_PROMPT,
            stream: false,
        };

        let response = self.http_client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api { status, body });
        }

        info!(
            "translation model '{}' registered (base: {})",
            self.model_name, self.base_model
        );
        Ok(())
    }

    /// One-shot translation of `text`.
    pub async fn translate(&self, text: &str) -> TranslationResult<String> {
        debug!("translating {} chars", text.chars().count());

        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: text,
            }],
            stream: false,
        };

        let response = self.http_client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        if chat.message.content.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(chat.message.content)
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(&self, text: &str) -> Result<String> {
        Ok(TranslationClient::translate(self, text).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_role_and_content() {
        let request = ChatRequest {
            model: "manga-translator",
            messages: vec![ChatMessage {
                role: "user",
                content: "こんにちは",
            }],
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "manga-translator");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "こんにちは");
    }

    #[test]
    fn chat_response_parses_message_content() {
        let raw = r#"{
            "model": "manga-translator",
            "created_at": "2025-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "Hello"},
            "done": true
        }"#;

        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.message.content, "Hello");
    }

    #[test]
    fn create_request_carries_persona_system_prompt() {
        let request = CreateModelRequest {
            model: "manga-translator",
            from: "qwen2.5",
            system: PERSONA_SYSTEM_PROMPT,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["from"], "qwen2.5");
        assert!(json["system"]
            .as_str()
            .unwrap()
            .contains("embedded translation assistant"));
    }
}
