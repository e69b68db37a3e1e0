//! Configuration commands.

use anyhow::Result;
use colored::Colorize;

use crate::config::{Config, LlmConfig};
use crate::exit_codes::*;

pub struct ConfigShowArgs {
    pub show_secrets: bool,
}

/// The provider choice for `counsel config llm`.
pub enum LlmProvider {
    Groq { model: String, api_key: Option<String> },
    OpenAi { model: String, api_key: Option<String> },
    Ollama { endpoint: String, model: String },
}

pub fn execute_show(args: ConfigShowArgs) -> Result<i32> {
    let config = Config::load()?;

    println!("{}", "Configuration".bold());
    println!("  config file: {}", Config::config_path()?.display());
    println!("  index path:  {}", config.index_path());
    println!("  corpus path: {}", config.corpus_path());
    println!("  archive dir: {}", config.archive_dir());
    println!();

    println!("{}", "LLM".bold());
    println!("  provider: {}", config.llm.provider);
    println!("  endpoint: {}", config.llm.endpoint);
    println!("  model:    {}", config.llm.model);
    let key = if args.show_secrets {
        config.llm.get_api_key()
    } else {
        config.llm.masked_api_key()
    };
    match key {
        Some(key) => println!("  api key:  {key}"),
        None => println!("  api key:  {}", "not set".yellow()),
    }
    if !config.llm.is_ready() {
        println!("  {}", "LLM is not ready, advice generation will fail".yellow());
    }
    println!();

    println!("{}", "Embeddings".bold());
    println!("  provider:   {}", config.embeddings.provider);
    println!("  endpoint:   {}", config.embeddings.endpoint);
    println!("  model:      {}", config.embeddings.model);
    println!("  dimensions: {}", config.embeddings.dimensions);
    println!();

    println!("{}", "Topic classifier".bold());
    println!("  endpoint: {}", config.classifier.endpoint);
    println!("  model:    {}", config.classifier.model);

    Ok(EXIT_SUCCESS)
}

pub fn execute_llm(provider: LlmProvider) -> Result<i32> {
    let mut config = Config::load()?;

    config.llm = match provider {
        LlmProvider::Groq { model, api_key } => {
            let mut llm = LlmConfig::groq(&model);
            llm.api_key = api_key;
            llm
        }
        LlmProvider::OpenAi { model, api_key } => {
            let mut llm = LlmConfig::openai(&model);
            llm.api_key = api_key;
            llm
        }
        LlmProvider::Ollama { endpoint, model } => LlmConfig::ollama(&endpoint, &model),
    };

    config.save()?;
    println!(
        "{} LLM set to {} ({})",
        "Saved:".green().bold(),
        config.llm.provider,
        config.llm.model
    );
    if !config.llm.is_ready() {
        println!(
            "{}",
            "No API key available yet. Set the provider's environment variable or pass --api-key."
                .yellow()
        );
    }
    Ok(EXIT_SUCCESS)
}
