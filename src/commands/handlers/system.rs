use async_trait::async_trait;

use super::collaborator_failure;
use crate::commands::context::CommandContext;
use crate::commands::effect::{CommandResult, Effect};
use crate::commands::registry::{CommandCategory, CommandDefinition, CommandHandler};

pub(crate) struct Quit;

#[async_trait]
impl CommandHandler for Quit {
    async fn execute(
        &self,
        _args: &[String],
        _context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        Ok(CommandResult::action(Effect::Exit))
    }
}

pub(crate) const QUIT: CommandDefinition = CommandDefinition {
    name: "quit",
    aliases: &["exit", "q"],
    description: "Exit the CLI",
    usage: None,
    category: CommandCategory::System,
    hidden: false,
    handler: &Quit,
};

pub(crate) struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn execute(
        &self,
        _args: &[String],
        _context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        Ok(CommandResult::action(Effect::ToggleHelp))
    }
}

pub(crate) const HELP: CommandDefinition = CommandDefinition {
    name: "help",
    aliases: &["h", "?"],
    description: "Toggle command help display",
    usage: None,
    category: CommandCategory::Utility,
    hidden: false,
    handler: &Help,
};

pub(crate) struct Stats;

#[async_trait]
impl CommandHandler for Stats {
    async fn execute(
        &self,
        _args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let stats = match context.ai.usage_stats().await {
            Ok(stats) => stats,
            Err(err) => return Ok(collaborator_failure(&err, "Failed to fetch usage statistics")),
        };

        let lines = [
            "📊 Usage Statistics:".to_string(),
            format!("  • Total requests: {}", stats.total_requests),
            format!("  • Total tokens: {}", stats.total_tokens),
            format!("  • Session tokens: {}", context.total_tokens),
            format!("  • Current model: {}", context.current_model),
            format!("  • Active chat: {}", context.current_chat_title),
            format!("  • Messages in chat: {}", context.messages.len()),
        ];
        Ok(CommandResult::info(lines.join("\n")))
    }
}

pub(crate) const STATS: CommandDefinition = CommandDefinition {
    name: "stats",
    aliases: &["usage", "info"],
    description: "View usage statistics",
    usage: None,
    category: CommandCategory::Utility,
    hidden: false,
    handler: &Stats,
};
