//! Corpus indexing command.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use counsel_guidance::corpus::JsonlExampleStore;

use crate::config::Config;
use crate::exit_codes::*;
use crate::runtime;

pub struct IndexArgs {
    /// JSONL dataset to index; falls back to the configured corpus path.
    pub dataset: Option<String>,
    pub namespace: String,
    pub batch_size: usize,
}

pub async fn execute(args: IndexArgs) -> Result<i32> {
    let config = Config::load()?;
    let dataset = args.dataset.unwrap_or_else(|| config.corpus_path());

    let store = JsonlExampleStore::open(Path::new(&dataset))
        .with_context(|| format!("Failed to load corpus at {dataset}"))?;
    if store.is_empty() {
        eprintln!("{} no examples found in {dataset}", "Nothing to index:".yellow());
        return Ok(EXIT_ERROR);
    }
    println!("Indexing {} examples from {dataset}...", store.len());

    let indexer = match runtime::build_indexer(&config, args.batch_size).await {
        Ok(indexer) => indexer,
        Err(e) => {
            eprintln!("{} {e:#}", "Configuration error:".red());
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    match indexer.index_records(store.records(), &args.namespace).await {
        Ok(written) => {
            println!(
                "{} {written} examples indexed into namespace '{}'",
                "Done:".green().bold(),
                args.namespace
            );
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {e}", "Indexing failed:".red());
            Ok(EXIT_NETWORK_ERROR)
        }
    }
}
