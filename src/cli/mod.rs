//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod repl;
pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::model_list::{list_models, set_default_model};
use crate::cli::repl::run_chat;
use crate::cli::say::run_say;
use crate::core::client::AiClient;
use crate::core::config::Config;
use crate::logging;

#[derive(Parser)]
#[command(name = "parlance", version)]
#[command(about = "A terminal chat client for hosted LLM APIs")]
#[command(
    long_about = "Parlance is a line-oriented terminal chat client for OpenAI-compatible APIs. \
Replies stream in as they are generated and every conversation is saved locally.\n\n\
Environment Variables:\n\
  PARLANCE_API_KEY  API key (the variable name can be changed with api_key_env in config.toml)\n\
  PARLANCE_LOG      Log filter, e.g. 'parlance=debug'\n\n\
Input:\n\
  Type a message and press Enter to send it\n\
  @file:path        Attach an image to the message\n\
  /help             List slash commands\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Wait for complete replies instead of streaming them
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and print the reply
    Say {
        /// Prompt text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the models the API offers
    Models,
    /// Check a model against the API and save it as the default
    SetDefaultModel {
        /// Model id, matched case-insensitively
        model: String,
    },
}

/// Fold command-line overrides into the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(model) = args.model.as_deref().filter(|m| !m.trim().is_empty()) {
        config.default_model = Some(model.trim().to_string());
    }
    if let Some(base_url) = args.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        config.base_url = Some(base_url.trim().to_string());
    }
    if args.no_stream {
        config.stream = Some(false);
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut config = Config::load()?;
    apply_overrides(&mut config, &args);
    let api_key = config.api_key()?;
    debug!(base_url = config.base_url(), model = config.model(), "configuration loaded");

    let client = AiClient::new(reqwest::Client::new(), config.base_url(), api_key);

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config, client).await,
        Commands::Say { prompt } => run_say(prompt, &config, &client).await,
        Commands::Models => list_models(&config, &client).await,
        Commands::SetDefaultModel { model } => set_default_model(&model, &client).await,
    }
}

#[cfg(test)]
mod tests;
