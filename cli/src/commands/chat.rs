//! Interactive chat session.
//!
//! Loop: read a message, screen it for red flags, run the pipeline, render
//! the advice and fold the turn into the running history string. Every turn
//! re-archives the transcript JSON so a crash loses at most the last turn.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use counsel_guidance::GuidanceError;
use counsel_guidance::safety;
use counsel_guidance::types::Conversation;

use crate::commands::guide::parse_profile;
use crate::config::Config;
use crate::exit_codes::*;
use crate::runtime;

/// Shown instead of advice when generation fails mid-session.
const APOLOGY: &str =
    "I'm sorry, I can't generate advice right now. Please try again in a moment.";

pub struct ChatArgs {
    pub profile: Vec<String>,
    pub patient_id: Option<String>,
    pub top_k: usize,
}

pub async fn execute(args: ChatArgs) -> Result<i32> {
    let config = Config::load()?;
    let profile = parse_profile(&args.profile)?;
    let engine = match runtime::build_engine(&config, args.top_k).await {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{} {e:#}", "Configuration error:".red());
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let mut conversation = Conversation::new(session_id.clone(), args.patient_id.clone());
    let mut history = String::new();

    println!("{}", "Counselor guidance session started.".bold());
    println!("Type a patient message, or 'exit' to finish.\n");

    let stdin = io::stdin();
    loop {
        print!("{} ", "Counselor:".cyan().bold());
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        conversation.push_message(input, true);

        if let Some(flag) = safety::screen(input) {
            println!("\n{}", "---- Safety Protocol ----".red().bold());
            println!("{}\n", flag.response);
            conversation.push_message(flag.response, false);
            archive(&config, &conversation)?;
            continue;
        }

        let profile_ref = (!profile.is_empty()).then_some(&profile);
        let advice = match engine.generate_guidance(input, profile_ref, &history).await {
            Ok(result) => {
                println!("\n{}", "---- Generated Advice ----".green().bold());
                termimad::print_text(&result.generated_advice);
                println!(
                    "\n{} {} (confidence {:.2})   {} {} (score {})\n",
                    "Topic:".bold(),
                    result.predicted_topic,
                    result.topic_confidence,
                    "Sentiment:".bold(),
                    result.sentiment,
                    result.sentiment_score
                );
                result.generated_advice
            }
            Err(e @ (GuidanceError::Generation(_) | GuidanceError::MalformedEnvelope(_))) => {
                log::error!("Advice generation failed: {e}");
                println!("\n{APOLOGY}\n");
                APOLOGY.to_string()
            }
            Err(e) => return Err(e.into()),
        };

        history.push_str(&format!("\nCounselor: {input}\nAdvice: {advice}\n"));
        conversation.push_message(&advice, false);
        archive(&config, &conversation)?;
    }

    println!("Session {session_id} archived.");
    Ok(EXIT_SUCCESS)
}

/// Write the transcript to `<archive_dir>/<session_id>.json`, replacing any
/// previous snapshot of the same session.
fn archive(config: &Config, conversation: &Conversation) -> Result<()> {
    let dir = config.archive_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {dir}"))?;
    let path = Path::new(&dir).join(format!("{}.json", conversation.session_id));
    let raw = serde_json::to_string_pretty(conversation)?;
    fs::write(&path, raw).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_writes_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.archive_dir = Some(dir.path().to_str().unwrap().to_string());

        let mut conversation = Conversation::new("s1", Some("p1".to_string()));
        conversation.push_message("I feel stuck", true);
        archive(&config, &conversation).unwrap();

        let raw = fs::read_to_string(dir.path().join("s1.json")).unwrap();
        let parsed: Conversation = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert_eq!(parsed.messages.len(), 1);
    }

    #[test]
    fn test_archive_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.archive_dir = Some(dir.path().to_str().unwrap().to_string());

        let mut conversation = Conversation::new("s1", None);
        conversation.push_message("first", true);
        archive(&config, &conversation).unwrap();
        conversation.push_message("second", false);
        archive(&config, &conversation).unwrap();

        let raw = fs::read_to_string(dir.path().join("s1.json")).unwrap();
        let parsed: Conversation = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.messages.len(), 2);
    }
}
