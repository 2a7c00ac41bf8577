use async_trait::async_trait;

use super::collaborator_failure;
use crate::commands::context::CommandContext;
use crate::commands::effect::{CommandResult, Effect, ViewMode};
use crate::commands::parser::join_args;
use crate::commands::registry::{CommandCategory, CommandDefinition, CommandHandler};

const MODEL_LIST_LIMIT: usize = 15;
const USAGE_MODELS: &str = "/models [list|set <model>|current]";

pub(crate) struct Image;

#[async_trait]
impl CommandHandler for Image {
    async fn execute(
        &self,
        args: &[String],
        _context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let prompt = (!args.is_empty()).then(|| join_args(args));
        Ok(CommandResult::action(Effect::SetMode {
            mode: ViewMode::ImageGenerator,
            prompt,
        }))
    }
}

pub(crate) const IMAGE: CommandDefinition = CommandDefinition {
    name: "image",
    aliases: &["img", "generate"],
    description: "Generate an image with AI",
    usage: Some("/image [prompt]"),
    category: CommandCategory::Ai,
    hidden: false,
    handler: &Image,
};

pub(crate) struct Models;

impl Models {
    async fn list(&self, context: &CommandContext<'_>) -> CommandResult {
        let models = match context.ai.list_models().await {
            Ok(models) => models,
            Err(err) => return collaborator_failure(&err, "Failed to fetch models from API"),
        };
        if models.is_empty() {
            return CommandResult::info("No models available");
        }

        let listing = models
            .iter()
            .take(MODEL_LIST_LIMIT)
            .map(|model| format!("  • {}", model.id))
            .collect::<Vec<_>>()
            .join("\n");
        let more = match models.len().saturating_sub(MODEL_LIST_LIMIT) {
            0 => String::new(),
            n => format!("\n  ... and {n} more"),
        };
        CommandResult::info(format!(
            "📦 Available Models:\n{listing}{more}\n\nCurrent: {}",
            context.current_model
        ))
    }

    async fn set(&self, requested: Option<&String>, context: &CommandContext<'_>) -> CommandResult {
        let Some(requested) = requested else {
            return CommandResult::failure("Usage: /models set <model-name>");
        };

        let models = match context.ai.list_models().await {
            Ok(models) => models,
            Err(err) => return collaborator_failure(&err, "Failed to validate model"),
        };
        let Some(model) = models
            .iter()
            .find(|model| model.id.eq_ignore_ascii_case(requested))
        else {
            return CommandResult::failure(format!(
                "Model \"{requested}\" not found. Use /models list to see available models."
            ));
        };

        CommandResult::success(vec![
            Effect::SetModel(model.id.clone()),
            Effect::ShowInfo(format!("✓ Model changed to: {}", model.id)),
        ])
    }
}

#[async_trait]
impl CommandHandler for Models {
    async fn execute(
        &self,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let subcommand = args.first().map(|arg| arg.to_lowercase());
        let result = match subcommand.as_deref() {
            None | Some("list") => self.list(context).await,
            Some("set") => self.set(args.get(1), context).await,
            Some("current") => {
                CommandResult::info(format!("Current model: {}", context.current_model))
            }
            Some(other) => CommandResult::failure(format!(
                "Unknown subcommand: {other}. Usage: {USAGE_MODELS}"
            )),
        };
        Ok(result)
    }
}

pub(crate) const MODELS: CommandDefinition = CommandDefinition {
    name: "models",
    aliases: &["model", "m"],
    description: "View available AI models",
    usage: Some(USAGE_MODELS),
    category: CommandCategory::Ai,
    hidden: false,
    handler: &Models,
};
