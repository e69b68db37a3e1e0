//! One-shot guidance command.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use colored::Colorize;
use counsel_guidance::GuidanceError;

use crate::config::Config;
use crate::exit_codes::*;
use crate::runtime;

pub struct GuideArgs {
    pub input: String,
    /// "key=value" pairs from the command line.
    pub profile: Vec<String>,
    pub history: Option<String>,
    pub top_k: usize,
    pub json: bool,
}

/// Parse repeated "key=value" flags into a profile map.
pub fn parse_profile(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut profile = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid profile entry '{pair}' (expected key=value)");
        };
        if key.trim().is_empty() {
            bail!("Invalid profile entry '{pair}' (empty key)");
        }
        profile.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(profile)
}

pub async fn execute(args: GuideArgs) -> Result<i32> {
    let config = Config::load()?;
    let profile = parse_profile(&args.profile)?;
    let engine = match runtime::build_engine(&config, args.top_k).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{} {e:#}", "Configuration error:".red());
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    let history = args.history.unwrap_or_default();
    let profile_ref = (!profile.is_empty()).then_some(&profile);
    let result = match engine
        .generate_guidance(&args.input, profile_ref, &history)
        .await
    {
        Ok(result) => result,
        Err(e @ (GuidanceError::Generation(_) | GuidanceError::MalformedEnvelope(_))) => {
            eprintln!("{} {e}", "Generation failed:".red());
            return Ok(EXIT_NETWORK_ERROR);
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("{}", "---- Guidance ----".bold());
    termimad::print_text(&result.generated_advice);
    println!();
    println!(
        "{} {} (confidence {:.2})",
        "Topic:".bold(),
        result.predicted_topic,
        result.topic_confidence
    );
    println!(
        "{} {} (score {})",
        "Sentiment:".bold(),
        result.sentiment,
        result.sentiment_score
    );
    if !result.historical_examples.is_empty() {
        println!("{}", "Similar past questions:".bold());
        for scored in &result.historical_examples {
            println!(
                "  {} {}",
                format!("[{:.2}]", scored.similarity).dimmed(),
                scored.example.question_text
            );
        }
    }

    Ok(EXIT_SUCCESS)
}
