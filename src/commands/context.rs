use std::path::Path;

use crate::core::client::AiService;
use crate::core::message::Message;
use crate::core::store::ChatStore;

/// Read-only snapshot of the session handed to a command. Commands request
/// changes through the returned effects, never through this view.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub ai: &'a dyn AiService,
    pub store: &'a dyn ChatStore,
    pub current_chat_id: Option<&'a str>,
    pub current_chat_title: &'a str,
    pub current_model: &'a str,
    pub messages: &'a [Message],
    pub total_tokens: u64,
    /// Base directory for files written by commands such as `/export`.
    pub working_dir: &'a Path,
}
