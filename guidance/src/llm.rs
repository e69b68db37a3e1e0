//! Chat model clients for advice generation.
//!
//! One OpenAI-compatible client covers OpenAI, Groq and any other endpoint
//! speaking the `/chat/completions` protocol; a second client targets
//! Ollama's native chat API. Both hand back a [`ResponseEnvelope`] and leave
//! normalization to the advice generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::advice::{ResponseEnvelope, ResponseMessage};
use crate::error::GuidanceError;

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1";
const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A chat completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one prompt and return the raw response envelope.
    async fn invoke(&self, prompt: &str) -> Result<ResponseEnvelope, GuidanceError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    /// Create a client against an OpenAI-compatible endpoint.
    ///
    /// `endpoint` defaults to "https://api.openai.com/v1".
    pub fn new(api_key: Option<String>, model: String, endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            model,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Create a client for Groq's hosted models.
    pub fn groq(api_key: String, model: Option<String>) -> Self {
        Self::new(
            Some(api_key),
            model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
            Some(GROQ_ENDPOINT.to_string()),
        )
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ResponseEnvelope, GuidanceError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let response = builder
            .send()
            .await
            .map_err(|e| GuidanceError::Generation(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GuidanceError::Generation(format!(
                "Chat endpoint error {status}: {body}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| GuidanceError::Generation(format!("Unparseable response: {e}")))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GuidanceError::Generation("Response had no choices".to_string()))?;

        Ok(ResponseEnvelope::Message(ResponseMessage {
            role: Some("assistant".to_string()),
            content: choice.message.content,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for a local Ollama instance.
pub struct OllamaChatModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaChatModel {
    /// `endpoint` defaults to "http://localhost:11434".
    pub fn new(model: String, endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn invoke(&self, prompt: &str) -> Result<ResponseEnvelope, GuidanceError> {
        let url = format!("{}/api/chat", self.endpoint);
        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GuidanceError::Generation(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GuidanceError::Generation(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let result: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GuidanceError::Generation(format!("Unparseable response: {e}")))?;

        Ok(ResponseEnvelope::Message(ResponseMessage {
            role: Some("assistant".to_string()),
            content: result.message.content,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
