use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::collaborator_failure;
use crate::commands::context::CommandContext;
use crate::commands::effect::{CommandResult, Effect};
use crate::commands::parser::join_args;
use crate::commands::registry::{CommandCategory, CommandDefinition, CommandHandler};
use crate::core::store::ExportFormat;

const USAGE_CHATS: &str = "/chats [new|list]";
const USAGE_TITLE: &str = "/title <new title>";
const USAGE_EXPORT: &str = "/export [markdown|md|json] [file]";

pub(crate) struct Clear;

#[async_trait]
impl CommandHandler for Clear {
    async fn execute(
        &self,
        _args: &[String],
        _context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        Ok(CommandResult::success(vec![
            Effect::ClearTranscript,
            Effect::ClearTokenCounter,
            Effect::ClearError,
        ]))
    }
}

pub(crate) const CLEAR: CommandDefinition = CommandDefinition {
    name: "clear",
    aliases: &["cls"],
    description: "Clear chat messages",
    usage: None,
    category: CommandCategory::Chat,
    hidden: false,
    handler: &Clear,
};

pub(crate) struct New;

#[async_trait]
impl CommandHandler for New {
    async fn execute(
        &self,
        _args: &[String],
        _context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        Ok(CommandResult::action(Effect::CreateNewChat))
    }
}

pub(crate) const NEW: CommandDefinition = CommandDefinition {
    name: "new",
    aliases: &[],
    description: "Start a new chat",
    usage: None,
    category: CommandCategory::Chat,
    hidden: false,
    handler: &New,
};

pub(crate) struct Chats;

#[async_trait]
impl CommandHandler for Chats {
    async fn execute(
        &self,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let subcommand = args.first().map(|arg| arg.to_lowercase());
        let result = match subcommand.as_deref() {
            Some("new") => CommandResult::action(Effect::CreateNewChat),
            None | Some("list") => match context.store.count().await {
                Ok(count) => {
                    let plural = if count == 1 { "" } else { "s" };
                    CommandResult::info(format!("You have {count} saved chat{plural}."))
                }
                Err(err) => collaborator_failure(&err, "Failed to retrieve chat count"),
            },
            Some(other) => CommandResult::failure(format!(
                "Unknown subcommand: {other}. Usage: {USAGE_CHATS}"
            )),
        };
        Ok(result)
    }
}

pub(crate) const CHATS: CommandDefinition = CommandDefinition {
    name: "chats",
    aliases: &["conversations", "history"],
    description: "List and manage saved chats",
    usage: Some(USAGE_CHATS),
    category: CommandCategory::Chat,
    hidden: false,
    handler: &Chats,
};

pub(crate) struct Star;

#[async_trait]
impl CommandHandler for Star {
    async fn execute(
        &self,
        _args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let Some(chat_id) = context.current_chat_id else {
            return Ok(CommandResult::failure("No active chat to star"));
        };

        let result = match context.store.toggle_star(chat_id).await {
            Ok(Some(true)) => CommandResult::info("⭐ Chat starred!"),
            Ok(Some(false)) => CommandResult::info("Chat unstarred"),
            Ok(None) => CommandResult::failure("No active chat to star"),
            Err(err) => collaborator_failure(&err, "Failed to toggle star status"),
        };
        Ok(result)
    }
}

pub(crate) const STAR: CommandDefinition = CommandDefinition {
    name: "star",
    aliases: &["favorite", "fav"],
    description: "Star/unstar the current chat",
    usage: None,
    category: CommandCategory::Chat,
    hidden: false,
    handler: &Star,
};

pub(crate) struct Title;

#[async_trait]
impl CommandHandler for Title {
    async fn execute(
        &self,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        if args.is_empty() {
            return Ok(CommandResult::failure(format!("Usage: {USAGE_TITLE}")));
        }
        let Some(chat_id) = context.current_chat_id else {
            return Ok(CommandResult::failure("No active chat to rename"));
        };

        let title = join_args(args);
        let result = match context.store.rename(chat_id, &title).await {
            Ok(Some(_)) => CommandResult::action(Effect::SetChatTitle(title)),
            Ok(None) => CommandResult::failure("No active chat to rename"),
            Err(err) => collaborator_failure(&err, "Failed to rename chat"),
        };
        Ok(result)
    }
}

pub(crate) const TITLE: CommandDefinition = CommandDefinition {
    name: "title",
    aliases: &["rename"],
    description: "Rename the current chat",
    usage: Some(USAGE_TITLE),
    category: CommandCategory::Chat,
    hidden: false,
    handler: &Title,
};

pub(crate) struct Export;

#[async_trait]
impl CommandHandler for Export {
    async fn execute(
        &self,
        args: &[String],
        context: &CommandContext<'_>,
    ) -> anyhow::Result<CommandResult> {
        let Some(chat_id) = context.current_chat_id else {
            return Ok(CommandResult::failure("No active chat to export"));
        };

        let format_arg = args.first().map(String::as_str).unwrap_or("markdown");
        let Some(format) = ExportFormat::parse(format_arg) else {
            return Ok(CommandResult::failure(format!(
                "Unknown format: {format_arg}. Supported formats: markdown, json"
            )));
        };

        let text = match context.store.export(chat_id, format).await {
            Ok(Some(text)) => text,
            Ok(None) => return Ok(CommandResult::failure("No active chat to export")),
            Err(err) => return Ok(collaborator_failure(&err, "Failed to export chat")),
        };

        let file_name = args
            .get(1)
            .cloned()
            .unwrap_or_else(|| format!("{chat_id}.{}", format.extension()));
        let path = context.working_dir.join(file_name);

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Ok(CommandResult::failure(format!(
                    "File '{}' already exists. Please choose a different file name.",
                    path.display()
                )));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to create {}", path.display()));
            }
        };
        fill_new_file(&path, file, &text).await?;

        Ok(CommandResult::info(format!(
            "📋 Exported chat to {}",
            path.display()
        )))
    }
}

/// Write `text` into a file this command just created at `path`. A partial
/// file is removed when the write fails.
async fn fill_new_file<W>(path: &Path, mut file: W, text: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
    .await;
    drop(file);

    if let Err(err) = written {
        let _ = tokio::fs::remove_file(path).await;
        return Err(err).with_context(|| format!("failed to write {}", path.display()));
    }
    Ok(())
}

pub(crate) const EXPORT: CommandDefinition = CommandDefinition {
    name: "export",
    aliases: &["save"],
    description: "Export the current chat",
    usage: Some(USAGE_EXPORT),
    category: CommandCategory::Chat,
    hidden: false,
    handler: &Export,
};
