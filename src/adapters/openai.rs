//! OpenAI-compatible API client: chat completions and audio transcription.
//!
//! Endpoints:
//!   POST {api_base}/v1/chat/completions
//!   POST {api_base}/v1/audio/transcriptions (multipart)
//! Auth: Bearer token.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::{LanguageModel, SpeechToText};
use crate::config::ModelConfig;

/// Sampling temperature for every chat call
pub const SAMPLING_TEMPERATURE: f64 = 0.7;

/// OpenAI-compatible REST client
pub struct OpenAiClient {
    api_base: String,
    api_key: String,
    chat_model: String,
    transcription_model: String,
    client: reqwest::Client,
}

/// Body for the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chat_model: config.chat_model.clone(),
            transcription_model: config.transcription_model.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: SAMPLING_TEMPERATURE,
        };

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach chat completions API")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat API error ({}): {}", status, text);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        debug!(model = %self.chat_model, "chat completion received");

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Chat response contained no choices")
    }
}

#[async_trait]
impl SpeechToText for OpenAiClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file {}", audio_path.display()))?;

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/m4a")?;

        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(self.api_url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription API")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Transcription API error ({}): {}", status, text);
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        debug!(model = %self.transcription_model, "transcription received");

        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OpenAiClient {
        OpenAiClient::new(&ModelConfig {
            api_key: "KEY".to_string(),
            api_base: "https://api.openai.com/".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            transcription_model: "whisper-1".to_string(),
        })
    }

    #[test]
    fn test_api_url() {
        let client = test_client();
        assert_eq!(
            client.api_url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            client.api_url("audio/transcriptions"),
            "https://api.openai.com/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "指示",
                },
                ChatMessage {
                    role: "user",
                    content: "記錄:\r\n內容",
                },
            ],
            temperature: SAMPLING_TEMPERATURE,
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["temperature"], 0.7);
    }
}
