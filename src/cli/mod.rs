//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod model_list;
pub mod say;


use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};

use crate::api::ChatMessage;
use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::{Config, Overrides, ResolvedConfig};
use crate::core::context::{current_preamble, inject_preamble};
use crate::core::session::StreamSession;
use crate::utils::logging::init_tracing;
use crate::utils::url::chat_endpoint;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")\nrustc ",
    env!("VERGEN_RUSTC_SEMVER"),
    "\nbuilt ",
    env!("VERGEN_BUILD_DATE"),
);

#[derive(Parser)]
#[command(name = "promptstream")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Stream chat replies from an Ollama-compatible endpoint")]
#[command(
    long_about = "promptstream sends a prompt to an Ollama-compatible /api/chat endpoint and \
prints the reply as it streams in.\n\n\
Environment Variables:\n\
  PROMPTSTREAM_ENDPOINT   Server base URL or full chat URL (default http://localhost:11434)\n\
  PROMPTSTREAM_MODEL      Model to use when -m is not given\n\
  RUST_LOG                Diagnostics filter (overrides -v)\n\n\
Chat commands:\n\
  /model <id>       Switch model for the next prompt\n\
  /log <filename>   Enable transcript logging to a file\n\
  /log              Toggle transcript logging pause/resume\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for the request
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Server base URL or full chat URL
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Append prompts and replies to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,

    /// Prefix the prompt with the current date, time and user name
    #[arg(long, global = true)]
    pub context: bool,

    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one prompt and stream the reply to stdout
    Say {
        /// Prompt text; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Line-based chat on stdin (default)
    Chat,
    /// List the built-in model catalog
    Models,
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (multiple words are joined)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the configuration file and effective settings
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = Config::load()?;
    let overrides = Overrides {
        endpoint: args.endpoint.clone(),
        model: args.model.clone(),
        inject_context: args.context,
    };
    let resolved = config.resolve(&overrides, |key| std::env::var(key).ok());

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Say { prompt } => run_say(prompt, &resolved, args.log).await,
        Commands::Chat => run_chat(&resolved, args.log).await,
        Commands::Models => {
            list_models(&resolved.model);
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = config;
            match config.set_value(&key, &value.join(" ")) {
                Ok(message) => {
                    config.save()?;
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Unset { key } => {
            let mut config = config;
            match config.unset_value(&key) {
                Ok(message) => {
                    config.save()?;
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Config => {
            if let Ok(path) = Config::get_config_path() {
                println!("Config file: {}", crate::core::config::data::path_display(path));
            }
            config.print_all(&resolved);
            Ok(())
        }
    }
}

/// Build a session against the resolved endpoint.
pub(crate) fn build_session(settings: &ResolvedConfig) -> Result<StreamSession, Box<dyn Error>> {
    let endpoint = chat_endpoint(&settings.endpoint)?;
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    let client = builder.build()?;
    Ok(StreamSession::new(client, endpoint, settings.model.clone()))
}

/// Messages for a single prompt, with the context preamble when enabled.
pub(crate) fn prompt_messages(prompt: &str, settings: &ResolvedConfig) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::user(prompt)];
    if settings.inject_context {
        let preamble = current_preamble(settings.user_name.as_deref(), settings.timezone);
        inject_preamble(&mut messages, &preamble);
    }
    messages
}
