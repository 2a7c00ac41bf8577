//! Parlance is a terminal chat client for OpenAI-compatible LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the AI client, the streaming decoder, chat persistence,
//!   configuration, and the [`core::session::Session`] that ties them together.
//! - [`commands`] implements slash-command parsing, the command registry, and
//!   the built-in commands. Commands describe state changes as effects and
//!   never mutate the session directly.
//! - [`api`] defines the wire payloads exchanged with the chat completions,
//!   models, and stats endpoints.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod utils;
