//! Name/alias indexed table of slash commands.
//!
//! Definitions are registered once at startup. Every name and alias must be
//! unique across the whole table; a clash is reported by [`CommandRegistry::register`]
//! before anything is inserted. Execution never fails outward: unknown
//! names, handler errors and handler panics all come back as a failed
//! [`CommandResult`].

use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use super::context::CommandContext;
use super::effect::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Chat,
    Ai,
    Navigation,
    Utility,
    System,
}

impl CommandCategory {
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Chat => "Chat",
            CommandCategory::Ai => "AI",
            CommandCategory::Navigation => "Navigation",
            CommandCategory::Utility => "Utility",
            CommandCategory::System => "System",
        }
    }

    /// Display order used by the help text.
    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Chat,
            CommandCategory::Ai,
            CommandCategory::Navigation,
            CommandCategory::Utility,
            CommandCategory::System,
        ]
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Body of a command. Handlers may bail with any error; the registry turns
/// it into a failed result.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult>;
}

#[derive(Clone, Copy)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub usage: Option<&'static str>,
    pub category: CommandCategory,
    /// Hidden commands still execute but are left out of listings.
    pub hidden: bool,
    pub handler: &'static dyn CommandHandler,
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("command name must not be empty")]
    EmptyName,
    #[error("command \"{0}\" is already registered")]
    DuplicateName(String),
    #[error("command name \"{0}\" conflicts with an existing alias")]
    NameConflictsWithAlias(String),
    #[error("alias \"{0}\" conflicts with an existing command name")]
    AliasConflictsWithName(String),
    #[error("alias \"{0}\" is already registered")]
    DuplicateAlias(String),
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDefinition>,
    names: HashMap<String, usize>,
    aliases: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, or reject it without side effects when its name or
    /// any alias is already taken.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), RegistrationError> {
        let name = definition.name.to_lowercase();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.names.contains_key(&name) {
            return Err(RegistrationError::DuplicateName(name));
        }
        if self.aliases.contains_key(&name) {
            return Err(RegistrationError::NameConflictsWithAlias(name));
        }

        let mut new_aliases = HashSet::new();
        for alias in definition.aliases {
            let alias = alias.to_lowercase();
            if alias == name || self.names.contains_key(&alias) {
                return Err(RegistrationError::AliasConflictsWithName(alias));
            }
            if self.aliases.contains_key(&alias) || !new_aliases.insert(alias.clone()) {
                return Err(RegistrationError::DuplicateAlias(alias));
            }
        }

        let index = self.commands.len();
        self.commands.push(definition);
        self.names.insert(name, index);
        for alias in new_aliases {
            self.aliases.insert(alias, index);
        }
        Ok(())
    }

    /// Case-insensitive lookup by name, then by alias.
    pub fn get(&self, name_or_alias: &str) -> Option<&CommandDefinition> {
        let key = name_or_alias.to_lowercase();
        self.names
            .get(&key)
            .or_else(|| self.aliases.get(&key))
            .map(|&index| &self.commands[index])
    }

    pub fn has(&self, name_or_alias: &str) -> bool {
        self.get(name_or_alias).is_some()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub async fn execute(
        &self,
        name_or_alias: &str,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> CommandResult {
        let Some(definition) = self.get(name_or_alias) else {
            debug!(command = name_or_alias, "Unknown command");
            return CommandResult::failure(format!(
                "Unknown command: /{name_or_alias}. Type /help for available commands."
            ));
        };

        debug!(command = definition.name, args = args.len(), "Executing command");
        let outcome = AssertUnwindSafe(definition.handler.execute(args, context))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(command = definition.name, error = %err, "Command failed");
                CommandResult::failure(format!("Error executing /{}: {err:#}", definition.name))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(command = definition.name, %message, "Command panicked");
                CommandResult::failure(format!("Error executing /{}: {message}", definition.name))
            }
        }
    }

    /// Names and aliases starting with `prefix`, sorted and de-duplicated.
    pub fn get_completions(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        self.names
            .keys()
            .chain(self.aliases.keys())
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Registered definitions in registration order.
    pub fn get_all(&self, include_hidden: bool) -> Vec<&CommandDefinition> {
        self.commands
            .iter()
            .filter(|definition| include_hidden || !definition.hidden)
            .collect()
    }

    pub fn get_by_category(&self, category: CommandCategory) -> Vec<&CommandDefinition> {
        self.get_all(false)
            .into_iter()
            .filter(|definition| definition.category == category)
            .collect()
    }

    pub fn help_text(&self) -> String {
        let mut lines = vec!["Available Commands:".to_string(), String::new()];

        for &category in CommandCategory::all() {
            let commands = self.get_by_category(category);
            if commands.is_empty() {
                continue;
            }

            lines.push(format!("  {}:", category.label()));
            for definition in commands {
                let aliases = if definition.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", definition.aliases.join(", "))
                };
                lines.push(format!(
                    "    /{}{} - {}",
                    definition.name, aliases, definition.description
                ));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "command panicked".to_string()
    }
}
