pub(super) mod ai;
pub(super) mod chat;
pub(super) mod system;

use tracing::warn;

use super::effect::CommandResult;
use super::registry::CommandDefinition;

/// Every built-in command, in help order within each category.
pub const BUILTIN_COMMANDS: &[CommandDefinition] = &[
    system::QUIT,
    system::HELP,
    chat::CLEAR,
    chat::NEW,
    chat::CHATS,
    chat::STAR,
    chat::TITLE,
    chat::EXPORT,
    ai::IMAGE,
    ai::MODELS,
    system::STATS,
];

/// Log the cause and report a short, user-facing failure.
pub(super) fn collaborator_failure(
    error: &dyn std::error::Error,
    message: &'static str,
) -> CommandResult {
    warn!(%error, "{message}");
    CommandResult::failure(message)
}
