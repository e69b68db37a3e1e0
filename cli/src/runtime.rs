//! Engine bootstrap: turns a [`Config`] into a wired [`GuidanceEngine`].
//!
//! Each provider is constructed once and shared behind an `Arc`; nothing in
//! the pipeline reaches for global state.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use counsel_guidance::advice::AdviceGenerator;
use counsel_guidance::corpus::JsonlExampleStore;
use counsel_guidance::embeddings::{EmbeddingProvider, OllamaEmbeddings, OpenAiEmbeddings};
use counsel_guidance::indexer::CorpusIndexer;
use counsel_guidance::llm::{ChatModel, OllamaChatModel, OpenAiChatModel};
use counsel_guidance::pipeline::GuidanceEngine;
use counsel_guidance::retrieval::Retriever;
use counsel_guidance::store::VectorIndex;
use counsel_guidance::topics::{TopicClassifier, ZeroShotClient};

use crate::config::Config;

/// Build the embedding provider from config.
pub fn build_embeddings(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let e = &config.embeddings;
    let provider: Arc<dyn EmbeddingProvider> = match e.provider.as_str() {
        "ollama" => Arc::new(OllamaEmbeddings::new(
            e.model.clone(),
            Some(e.endpoint.clone()),
            Some(e.dimensions),
        )),
        "openai" => {
            let api_key = e.api_key_env.as_ref().and_then(|v| std::env::var(v).ok());
            Arc::new(OpenAiEmbeddings::new(
                api_key,
                e.model.clone(),
                Some(e.endpoint.clone()),
                Some(e.dimensions),
            ))
        }
        other => bail!("Unknown embedding provider '{other}' (expected 'openai' or 'ollama')"),
    };
    Ok(provider)
}

/// Build the chat model from config.
pub fn build_chat_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    let llm = &config.llm;
    let model: Arc<dyn ChatModel> = match llm.provider.as_str() {
        "ollama" => Arc::new(OllamaChatModel::new(
            llm.model.clone(),
            Some(llm.endpoint.clone()),
        )),
        "groq" | "openai" => {
            let api_key = llm.get_api_key().with_context(|| {
                format!(
                    "No API key for LLM provider '{}'. Set {} or run `counsel config llm`",
                    llm.provider,
                    llm.api_key_env.as_deref().unwrap_or("an API key")
                )
            })?;
            Arc::new(OpenAiChatModel::new(
                Some(api_key),
                llm.model.clone(),
                Some(llm.endpoint.clone()),
            ))
        }
        other => bail!("Unknown LLM provider '{other}' (expected 'groq', 'openai' or 'ollama')"),
    };
    Ok(model)
}

/// Open the vector index at the configured path.
pub async fn open_index(config: &Config) -> Result<Arc<VectorIndex>> {
    let path = config.index_path();
    let index = VectorIndex::open(&path, config.embeddings.dimensions)
        .await
        .with_context(|| format!("Failed to open vector index at {path}"))?;
    Ok(Arc::new(index))
}

/// Load the JSONL example store, with the archive directory attached.
pub fn open_store(config: &Config) -> Result<Arc<JsonlExampleStore>> {
    let path = config.corpus_path();
    let store = JsonlExampleStore::open(Path::new(&path))
        .with_context(|| format!("Failed to load corpus at {path}"))?;
    Ok(Arc::new(store.with_archive_dir(config.archive_dir())))
}

/// Build the full engine.
pub async fn build_engine(config: &Config, top_k: usize) -> Result<GuidanceEngine> {
    let embeddings = build_embeddings(config)?;
    let index = open_index(config).await?;
    let store = open_store(config)?;

    let retriever = Retriever::new(embeddings, index, store);

    let c = &config.classifier;
    let api_key = c.api_key_env.as_ref().and_then(|v| std::env::var(v).ok());
    let classifier = TopicClassifier::new(Arc::new(ZeroShotClient::new(
        api_key,
        Some(c.model.clone()),
        Some(c.endpoint.clone()),
    )));

    let generator = AdviceGenerator::new(build_chat_model(config)?);

    Ok(GuidanceEngine::new(retriever, classifier, generator).with_top_k(top_k))
}

/// Build a corpus indexer against the configured index and embeddings.
pub async fn build_indexer(config: &Config, batch_size: usize) -> Result<CorpusIndexer> {
    let embeddings = build_embeddings(config)?;
    let index = open_index(config).await?;
    Ok(CorpusIndexer::new(embeddings, index).with_batch_size(batch_size))
}
