//! Configuration management.
//!
//! All settings live in one JSON file at `$HOME/.config/counsel/config.json`
//! (honoring `$XDG_CONFIG_HOME`). API keys are preferably referenced through
//! environment variable names so the file itself stays secret-free.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// LLM provider configuration for advice generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider kind: "groq", "openai" or "ollama".
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    /// Stored API key. `api_key_env` takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl LlmConfig {
    pub fn groq(model: &str) -> Self {
        Self {
            provider: "groq".to_string(),
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            model: model.to_string(),
            api_key: None,
            api_key_env: Some("GROQ_API_KEY".to_string()),
        }
    }

    pub fn openai(model: &str) -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            model: model.to_string(),
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
        }
    }

    pub fn ollama(endpoint: &str, model: &str) -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: None,
            api_key_env: None,
        }
    }

    /// Resolve the API key, environment first.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Some(key);
            }
        }
        self.api_key.clone()
    }

    /// Whether the provider can be called as configured.
    pub fn is_ready(&self) -> bool {
        if self.provider == "ollama" {
            return true;
        }
        self.get_api_key().is_some()
    }

    /// Masked API key for display.
    pub fn masked_api_key(&self) -> Option<String> {
        self.get_api_key().map(|key| {
            if key.len() > 8 {
                format!("{}...{}", &key[..4], &key[key.len() - 4..])
            } else {
                "****".to_string()
            }
        })
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::groq("llama-3.3-70b-versatile")
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider kind: "openai" (any compatible endpoint) or "ollama".
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    /// Vector dimensionality; must match what the index was built with.
    pub dimensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            api_key_env: None,
        }
    }
}

/// Zero-shot topic classification endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co".to_string(),
            model: "facebook/bart-large-mnli".to_string(),
            api_key_env: Some("HF_API_TOKEN".to_string()),
        }
    }
}

/// Complete CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Path to the LanceDB index. Defaults to `.counsel/examples.lance`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,
    /// Path to the JSONL corpus. Defaults to `data/counselchat.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_path: Option<String>,
    /// Directory for archived chat transcripts. Defaults to
    /// `.counsel/sessions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<String>,
}

impl Config {
    pub fn index_path(&self) -> String {
        self.index_path
            .clone()
            .unwrap_or_else(|| ".counsel/examples.lance".to_string())
    }

    pub fn corpus_path(&self) -> String {
        self.corpus_path
            .clone()
            .unwrap_or_else(|| "data/counselchat.jsonl".to_string())
    }

    pub fn archive_dir(&self) -> String {
        self.archive_dir
            .clone()
            .unwrap_or_else(|| ".counsel/sessions".to_string())
    }

    /// Path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let base = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let home = std::env::var("HOME")
                    .or_else(|_| std::env::var("USERPROFILE"))
                    .context("Neither HOME nor USERPROFILE is set")?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("counsel").join("config.json"))
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config at {}", path.display()))
    }

    /// Persist the configuration, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(())
    }
}
