//! Local persistence of chats.
//!
//! [`ChatStore`] is the narrow interface commands and the session talk to.
//! [`JsonChatStore`] keeps every chat in a single `chats.json` document,
//! newest first, re-reading it on each call and replacing it atomically on
//! every write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::core::message::Role;
use crate::utils::ids;

pub const CHATS_FILE_NAME: &str = "chats.json";
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub timestamp: i64,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    #[serde(default)]
    pub starred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(ExportFormat::Markdown),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode chats: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
    #[error("chat store lock poisoned")]
    Poisoned,
    #[error("chat store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// CRUD surface over persisted chats. Lookups of unknown ids yield `None`.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create(&self, title: Option<&str>) -> Result<Chat, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Chat>, StoreError>;
    async fn most_recent(&self) -> Result<Option<Chat>, StoreError>;
    async fn count(&self) -> Result<usize, StoreError>;
    async fn rename(&self, id: &str, title: &str) -> Result<Option<Chat>, StoreError>;
    /// Flip the star flag and return the new state.
    async fn toggle_star(&self, id: &str) -> Result<Option<bool>, StoreError>;
    async fn add_message(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<Option<StoredMessage>, StoreError>;
    async fn export(&self, id: &str, format: ExportFormat) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatsDocument {
    #[serde(default)]
    chats: Vec<Chat>,
}

pub struct JsonChatStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonChatStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CHATS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on the blocking pool while holding the file lock.
    async fn with_file<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
            f(&path)
        })
        .await?
    }

    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&ChatsDocument) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.with_file(move |path| Ok(f(&load(path)?))).await
    }

    /// Load, mutate and save under the lock. `f` returns the value to hand
    /// back and whether anything changed.
    async fn modify<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut ChatsDocument) -> (T, bool) + Send + 'static,
        T: Send + 'static,
    {
        self.with_file(move |path| {
            let mut document = load(path)?;
            let (value, changed) = f(&mut document);
            if changed {
                save(path, &document)?;
            }
            Ok(value)
        })
        .await
    }
}

fn load(path: &Path) -> Result<ChatsDocument, StoreError> {
    if !path.exists() {
        return Ok(ChatsDocument::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(ChatsDocument::default());
    }
    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save(path: &Path, document: &ChatsDocument) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let contents = serde_json::to_string_pretty(document)?;
    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .map_err(io_err)?;
    temp_file.write_all(contents.as_bytes()).map_err(io_err)?;
    temp_file.as_file_mut().sync_all().map_err(io_err)?;
    temp_file
        .persist(path)
        .map_err(|source| StoreError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn format_local(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_iso(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

pub fn chat_to_markdown(chat: &Chat) -> String {
    let mut lines = vec![
        format!("# {}", chat.title),
        String::new(),
        format!("*Created: {}*", format_local(chat.timestamp)),
    ];
    if chat.starred {
        lines.push("*⭐ Starred*".to_string());
    }
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    for message in &chat.messages {
        lines.push(format!("**{}:**", message.role.display_label()));
        lines.push(String::new());
        lines.push(message.content.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn chat_to_json(chat: &Chat) -> Result<String, serde_json::Error> {
    let messages: Vec<_> = chat
        .messages
        .iter()
        .map(|message| {
            serde_json::json!({
                "role": message.role,
                "content": message.content,
                "timestamp": format_iso(message.timestamp),
            })
        })
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({
        "title": chat.title,
        "createdAt": format_iso(chat.timestamp),
        "starred": chat.starred,
        "messages": messages,
    }))
}

#[async_trait]
impl ChatStore for JsonChatStore {
    async fn create(&self, title: Option<&str>) -> Result<Chat, StoreError> {
        let chat = Chat {
            id: ids::chat_id(),
            timestamp: now_millis(),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_CHAT_TITLE)
                .to_string(),
            messages: Vec::new(),
            starred: false,
        };
        debug!(chat_id = %chat.id, "Creating chat");
        let stored = chat.clone();
        self.modify(move |document| {
            document.chats.insert(0, stored);
            ((), true)
        })
        .await?;
        Ok(chat)
    }

    async fn get(&self, id: &str) -> Result<Option<Chat>, StoreError> {
        let id = id.to_string();
        self.read(move |document| document.chats.iter().find(|chat| chat.id == id).cloned())
            .await
    }

    async fn most_recent(&self) -> Result<Option<Chat>, StoreError> {
        self.read(|document| {
            document
                .chats
                .iter()
                .max_by_key(|chat| chat.timestamp)
                .cloned()
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.read(|document| document.chats.len()).await
    }

    async fn rename(&self, id: &str, title: &str) -> Result<Option<Chat>, StoreError> {
        let (id, title) = (id.to_string(), title.to_string());
        self.modify(move |document| {
            match document.chats.iter_mut().find(|chat| chat.id == id) {
                Some(chat) => {
                    chat.title = title;
                    (Some(chat.clone()), true)
                }
                None => (None, false),
            }
        })
        .await
    }

    async fn toggle_star(&self, id: &str) -> Result<Option<bool>, StoreError> {
        let id = id.to_string();
        self.modify(move |document| {
            match document.chats.iter_mut().find(|chat| chat.id == id) {
                Some(chat) => {
                    chat.starred = !chat.starred;
                    (Some(chat.starred), true)
                }
                None => (None, false),
            }
        })
        .await
    }

    async fn add_message(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        let (id, content) = (id.to_string(), content.to_string());
        self.modify(move |document| {
            match document.chats.iter_mut().find(|chat| chat.id == id) {
                Some(chat) => {
                    let message = StoredMessage {
                        id: ids::message_id(),
                        role,
                        content,
                        timestamp: now_millis(),
                    };
                    chat.messages.push(message.clone());
                    chat.timestamp = message.timestamp;
                    (Some(message), true)
                }
                None => (None, false),
            }
        })
        .await
    }

    async fn export(&self, id: &str, format: ExportFormat) -> Result<Option<String>, StoreError> {
        let Some(chat) = self.get(id).await? else {
            return Ok(None);
        };
        let text = match format {
            ExportFormat::Markdown => chat_to_markdown(&chat),
            ExportFormat::Json => chat_to_json(&chat)?,
        };
        Ok(Some(text))
    }
}
