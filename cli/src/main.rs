//! # Counsel CLI
//!
//! Retrieval-augmented guidance for mental-health counselors: given a
//! patient message, find similar historical Q&A pairs, classify topic and
//! sentiment, and draft structured advice for the counselor to review.
//!
//! ## Usage
//!
//! ```bash
//! # Index the counseling corpus
//! counsel index
//!
//! # One-shot guidance
//! counsel guide "I can't sleep and everything feels heavy"
//!
//! # Interactive session
//! counsel chat
//!
//! # HTTP API
//! counsel serve --addr 0.0.0.0:8000
//! ```

use clap::{Parser, Subcommand};
use counsel::commands;

/// Initialize logger based on verbose flag
fn init_logger(verbose: bool) {
    let mut log_builder = env_logger::Builder::from_default_env();
    if verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    } else {
        log_builder.filter_level(log::LevelFilter::Info);
    }
    log_builder.init();
}

#[derive(Parser)]
#[command(name = "counsel")]
#[command(about = "Counsel — retrieval-augmented guidance for counselors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive guidance session
    Chat {
        /// Patient profile entries as key=value (repeatable)
        #[arg(long, short = 'p', value_name = "KEY=VALUE")]
        profile: Vec<String>,
        /// Patient identifier for the archived transcript
        #[arg(long, value_name = "ID")]
        patient: Option<String>,
        /// Number of similar examples to retrieve per message
        #[arg(long, value_name = "COUNT", default_value = "3")]
        top_k: usize,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Generate guidance for a single message
    Guide {
        /// The patient message to analyze
        #[arg(value_name = "MESSAGE")]
        input: String,
        /// Patient profile entries as key=value (repeatable)
        #[arg(long, short = 'p', value_name = "KEY=VALUE")]
        profile: Vec<String>,
        /// Prior conversation text to include in the generation context
        #[arg(long, value_name = "TEXT")]
        history: Option<String>,
        /// Number of similar examples to retrieve
        #[arg(long, value_name = "COUNT", default_value = "3")]
        top_k: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Index a counseling corpus into the vector index
    Index {
        /// JSONL dataset path (defaults to the configured corpus)
        #[arg(value_name = "DATASET")]
        dataset: Option<String>,
        /// Index namespace
        #[arg(long, value_name = "NAMESPACE", default_value = "default")]
        namespace: String,
        /// Embedding batch size
        #[arg(long, value_name = "COUNT", default_value = "64")]
        batch_size: usize,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Serve the guidance engine over HTTP
    Serve {
        /// Address to bind
        #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8000")]
        addr: String,
        /// Number of similar examples to retrieve per request
        #[arg(long, value_name = "COUNT", default_value = "3")]
        top_k: usize,
        /// Enable verbose output
        #[arg(long, short = 'v')]
        verbose: bool,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Show full secrets instead of masked values
        #[arg(long)]
        show_secrets: bool,
    },
    /// Configure the LLM provider for advice generation
    Llm {
        #[command(subcommand)]
        command: LlmCommands,
    },
}

#[derive(Subcommand)]
enum LlmCommands {
    /// Use Groq's hosted models
    Groq {
        /// Model name
        #[arg(long, short = 'm', default_value = "llama-3.3-70b-versatile")]
        model: String,
        /// API key (optional, prefers GROQ_API_KEY env var)
        #[arg(long, short = 'k')]
        api_key: Option<String>,
    },
    /// Use OpenAI
    Openai {
        /// Model name
        #[arg(long, short = 'm', default_value = "gpt-4o-mini")]
        model: String,
        /// API key (optional, prefers OPENAI_API_KEY env var)
        #[arg(long, short = 'k')]
        api_key: Option<String>,
    },
    /// Use a local Ollama instance
    Ollama {
        /// Ollama API endpoint
        #[arg(long, short = 'e', default_value = "http://localhost:11434")]
        endpoint: String,
        /// Model name
        #[arg(long, short = 'm', default_value = "llama3.2")]
        model: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = run_command(cli.command).await;
    std::process::exit(exit_code);
}

async fn run_command(command: Commands) -> i32 {
    use counsel::exit_codes::*;

    match command {
        Commands::Chat {
            profile,
            patient,
            top_k,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::chat::ChatArgs {
                profile,
                patient_id: patient,
                top_k,
            };
            match commands::chat::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Chat error: {e:#}");
                    EXIT_ERROR
                }
            }
        }
        Commands::Guide {
            input,
            profile,
            history,
            top_k,
            json,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::guide::GuideArgs {
                input,
                profile,
                history,
                top_k,
                json,
            };
            match commands::guide::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Guide error: {e:#}");
                    EXIT_ERROR
                }
            }
        }
        Commands::Index {
            dataset,
            namespace,
            batch_size,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::index::IndexArgs {
                dataset,
                namespace,
                batch_size,
            };
            match commands::index::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Index error: {e:#}");
                    EXIT_ERROR
                }
            }
        }
        Commands::Serve {
            addr,
            top_k,
            verbose,
        } => {
            init_logger(verbose);
            let args = commands::serve::ServeArgs { addr, top_k };
            match commands::serve::execute(args).await {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Serve error: {e:#}");
                    EXIT_ERROR
                }
            }
        }
        Commands::Config { command } => run_config_command(command),
    }
}

fn run_config_command(command: ConfigCommands) -> i32 {
    use counsel::exit_codes::*;

    match command {
        ConfigCommands::Show { show_secrets } => {
            let args = commands::config::ConfigShowArgs { show_secrets };
            match commands::config::execute_show(args) {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Config error: {e:#}");
                    EXIT_CONFIG_ERROR
                }
            }
        }
        ConfigCommands::Llm { command } => {
            use commands::config::LlmProvider;

            let provider = match command {
                LlmCommands::Groq { model, api_key } => LlmProvider::Groq { model, api_key },
                LlmCommands::Openai { model, api_key } => LlmProvider::OpenAi { model, api_key },
                LlmCommands::Ollama { endpoint, model } => LlmProvider::Ollama { endpoint, model },
            };
            match commands::config::execute_llm(provider) {
                Ok(exit_code) => exit_code,
                Err(e) => {
                    eprintln!("Config LLM error: {e:#}");
                    EXIT_CONFIG_ERROR
                }
            }
        }
    }
}
