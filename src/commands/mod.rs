//! Slash commands: parsing, the registry and the built-in definitions.
//!
//! Commands never touch session state. Each returns a [`CommandResult`]
//! whose [`Effect`]s the session applies in order.

mod context;
mod effect;
mod handlers;
mod parser;
mod registry;

pub use context::CommandContext;
pub use effect::{CommandResult, Effect, ViewMode};
pub use handlers::BUILTIN_COMMANDS;
pub use parser::{is_command, join_args, parse_command, tokenize, ParsedCommand, COMMAND_MARKER};
pub use registry::{
    CommandCategory, CommandDefinition, CommandHandler, CommandRegistry, RegistrationError,
};

/// Registry holding every built-in command.
pub fn builtin_registry() -> Result<CommandRegistry, RegistrationError> {
    let mut registry = CommandRegistry::new();
    for definition in BUILTIN_COMMANDS {
        registry.register(*definition)?;
    }
    Ok(registry)
}
