//! LLM provider adapters.
//!
//! A closed set of providers ([`ProviderKind`]) behind one capability trait,
//! [`LlmAdapter`]. Adapter selection is a pure mapping from the configured
//! provider string, validated eagerly at startup — an unknown name is a
//! configuration error before any request is made.
//!
//! Two adapters ship:
//! - [`OpenAiChat`] — any OpenAI-compatible `POST /chat/completions`
//!   endpoint, selected via `base_url`.
//! - [`GeminiChat`] — the Gemini `generateContent` API. Gemini takes a
//!   single prompt, so the message sequence is flattened into a labeled
//!   transcript before sending.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::models::{ConversationTurn, Role};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One message in the sequence handed to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn from_turn(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Fixed sampling parameters. Set once from configuration; not overridable
/// per call.
#[derive(Debug, Clone, Copy)]
pub struct ChatParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for ChatParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Capability interface all providers implement.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Send a message sequence and return the model's reply text.
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String>;

    /// `"<provider>/<model>"`, for logging.
    fn model_name(&self) -> String;
}

/// The closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiCompatible,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(Self::OpenAiCompatible),
            "gemini" => Ok(Self::Gemini),
            other => Err(Error::Config(format!(
                "unknown LLM provider '{other}': must be openai or gemini"
            ))),
        }
    }
}

/// Build the adapter for the configured provider.
///
/// Fails with a configuration error for unknown provider names or a missing
/// API key, before any request is attempted.
pub fn create_adapter(config: &LlmConfig) -> Result<Box<dyn LlmAdapter>> {
    match ProviderKind::from_str(&config.provider)? {
        ProviderKind::OpenAiCompatible => Ok(Box::new(OpenAiChat::new(config)?)),
        ProviderKind::Gemini => Ok(Box::new(GeminiChat::new(config)?)),
    }
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

// ============ OpenAI-compatible ============

/// Chat adapter for OpenAI-compatible APIs.
pub struct OpenAiChat {
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl LlmAdapter for OpenAiChat {
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        let generation_err = |reason: String| Error::Generation {
            provider: "openai".to_string(),
            reason,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| generation_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(generation_err(format!("HTTP {status}: {body_text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| generation_err(e.to_string()))?;

        parse_chat_completion(&json).ok_or_else(|| {
            generation_err("response missing choices[0].message.content".to_string())
        })
    }

    fn model_name(&self) -> String {
        format!("openai/{}", self.model)
    }
}

fn parse_chat_completion(json: &serde_json::Value) -> Option<String> {
    json.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

// ============ Gemini ============

/// Chat adapter for the Gemini `generateContent` API.
pub struct GeminiChat {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY environment variable not set".to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            client: build_client(config.timeout_secs)?,
        })
    }
}

/// Flatten a message sequence into a single labeled transcript.
fn flatten_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("User: {}", m.content),
            Role::Assistant => format!("Assistant: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl LlmAdapter for GeminiChat {
    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<String> {
        let prompt = flatten_transcript(messages);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_tokens,
            },
        });

        let generation_err = |reason: String| Error::Generation {
            provider: "gemini".to_string(),
            reason,
        };

        let url = format!(
            "{}/models/{}:generateContent",
            GEMINI_BASE_URL, self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| generation_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(generation_err(format!("HTTP {status}: {body_text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| generation_err(e.to_string()))?;

        parse_gemini_response(&json).ok_or_else(|| {
            generation_err("response missing candidates[0].content.parts[0].text".to_string())
        })
    }

    fn model_name(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

fn parse_gemini_response(json: &serde_json::Value) -> Option<String> {
    json.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(
            "openai".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCompatible
        );
        assert_eq!(
            "gemini".parse::<ProviderKind>().unwrap(),
            ProviderKind::Gemini
        );
        assert!("copilot".parse::<ProviderKind>().is_err());
        assert!("".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_parse_chat_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "hi there" } }]
        });
        assert_eq!(parse_chat_completion(&json).unwrap(), "hi there");
        assert!(parse_chat_completion(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_parse_gemini_response() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "answer" }] } }]
        });
        assert_eq!(parse_gemini_response(&json).unwrap(), "answer");
        assert!(parse_gemini_response(&serde_json::json!({})).is_none());
    }

    #[test]
    fn test_flatten_transcript_labels_roles() {
        let messages = vec![
            ChatMessage::user("first question"),
            ChatMessage {
                role: Role::Assistant,
                content: "an answer".to_string(),
            },
            ChatMessage::user("follow-up"),
        ];
        let transcript = flatten_transcript(&messages);
        assert_eq!(
            transcript,
            "User: first question\nAssistant: an answer\nUser: follow-up"
        );
    }

    #[test]
    fn test_chat_message_serializes_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }
}
