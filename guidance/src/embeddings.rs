//! Embedding provider trait and HTTP implementations.
//!
//! Two backends are supported: any OpenAI-compatible `/embeddings` endpoint
//! (which is how hosted MiniLM-class sentence encoders are usually exposed)
//! and Ollama's native embed API. Adapters construct one provider at startup
//! and share it behind an `Arc`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GuidanceError;

/// Converts text into dense vectors for indexing and retrieval.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GuidanceError>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;

    /// Model identifier, for logging and config display.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedItem {
    embedding: Vec<f32>,
}

/// Provider for OpenAI-compatible embedding endpoints.
///
/// The API key is optional so self-hosted compatible servers work without
/// authentication.
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dims: usize,
}

impl OpenAiEmbeddings {
    /// Create a provider against an OpenAI-compatible endpoint.
    ///
    /// `endpoint` defaults to "https://api.openai.com/v1" and `dims` to 384,
    /// matching MiniLM-class sentence encoders.
    pub fn new(
        api_key: Option<String>,
        model: String,
        endpoint: Option<String>,
        dims: Option<usize>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            model,
            dims: dims.unwrap_or(384),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GuidanceError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(GuidanceError::Embedding(
                "Embedding endpoint returned no vectors".to_string(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.endpoint);
        let request = OpenAiEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GuidanceError::Embedding(format!(
                "Embedding endpoint error {status}: {body}"
            )));
        }

        let result: OpenAiEmbedResponse = response.json().await?;
        if result.data.len() != texts.len() {
            return Err(GuidanceError::Embedding(format!(
                "Expected {} vectors, got {}",
                texts.len(),
                result.data.len()
            )));
        }
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Provider for a local Ollama instance.
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dims: usize,
}

impl OllamaEmbeddings {
    /// Create an Ollama provider.
    ///
    /// `endpoint` defaults to "http://localhost:11434" and `dims` to 384
    /// ("all-minilm").
    pub fn new(model: String, endpoint: Option<String>, dims: Option<usize>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
            dims: dims.unwrap_or(384),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GuidanceError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(GuidanceError::Embedding(
                "Ollama returned no vectors".to_string(),
            ));
        }
        Ok(vectors.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuidanceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.endpoint);
        let request = OllamaEmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GuidanceError::Embedding(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let result: OllamaEmbedResponse = response.json().await?;
        Ok(result.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
