//! The interactive shell state: transcript, active chat, mode and notices.
//!
//! Commands return effects; [`Session::apply`] is the only place they turn
//! into state changes. Plain text goes through [`Session::submit`], which
//! persists both sides of the exchange and streams the reply.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::commands::{
    is_command, parse_command, CommandContext, CommandRegistry, Effect, ViewMode,
};
use crate::core::attachment::{
    decode_data_url, extension_for_mime_type, is_supported_image, parse_file_reference,
    ImageAttachment,
};
use crate::core::client::{AiService, GeneratedImages};
use crate::core::config::Config;
use crate::core::error::ChatError;
use crate::core::message::{Message, Role};
use crate::core::request::{ChatOptions, Sampling, VisionOptions};
use crate::core::store::{ChatStore, DEFAULT_CHAT_TITLE};

const TITLE_MAX_CHARS: usize = 50;
const TITLE_KEEP_CHARS: usize = 47;
const DEFAULT_IMAGE_QUESTION: &str = "What's in this image?";
const IMAGES_DIR_NAME: &str = "images";
const UNSUPPORTED_FILE_MESSAGE: &str = "Unsupported file type. Supported: PNG, JPEG, GIF, WebP, BMP";

/// Whether the caller should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The single status line shown under the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }
}

/// Models, sampling and filesystem locations a session works with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub vision_model: String,
    pub image_model: String,
    pub stream: bool,
    pub sampling: Sampling,
    /// Generated images land in `<data_dir>/images`.
    pub data_dir: PathBuf,
    /// Relative `@file:` references and export targets resolve here.
    pub working_dir: PathBuf,
}

impl SessionSettings {
    pub fn from_config(config: &Config, data_dir: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            model: config.model().to_string(),
            vision_model: config.vision_model().to_string(),
            image_model: config.image_model().to_string(),
            stream: config.stream_enabled(),
            sampling: config.sampling(),
            data_dir,
            working_dir,
        }
    }
}

pub struct Session {
    registry: CommandRegistry,
    ai: Arc<dyn AiService>,
    store: Arc<dyn ChatStore>,
    settings: SessionSettings,
    mode: ViewMode,
    chat_id: Option<String>,
    chat_title: String,
    model: String,
    transcript: Vec<Message>,
    total_tokens: u64,
    notice: Option<Notice>,
    help_visible: bool,
    pending_image_prompt: Option<String>,
}

/// Shorten a first message into a chat title.
pub fn title_from_message(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > TITLE_MAX_CHARS {
        let kept: String = text.chars().take(TITLE_KEEP_CHARS).collect();
        format!("{kept}...")
    } else {
        text.to_string()
    }
}

impl Session {
    pub fn new(
        registry: CommandRegistry,
        ai: Arc<dyn AiService>,
        store: Arc<dyn ChatStore>,
        settings: SessionSettings,
    ) -> Self {
        let model = settings.model.clone();
        Self {
            registry,
            ai,
            store,
            settings,
            mode: ViewMode::Chat,
            chat_id: None,
            chat_title: DEFAULT_CHAT_TITLE.to_string(),
            model,
            transcript: Vec::new(),
            total_tokens: 0,
            notice: None,
            help_visible: false,
            pending_image_prompt: None,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn chat_title(&self) -> &str {
        &self.chat_title
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Hand the current notice to the caller, clearing it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn help_text(&self) -> String {
        self.registry.help_text()
    }

    pub fn completions(&self, prefix: &str) -> Vec<String> {
        self.registry.get_completions(prefix)
    }

    /// Resume the most recent chat if nothing was said in it yet, otherwise
    /// start a fresh one.
    pub async fn startup(&mut self) {
        match self.store.most_recent().await {
            Ok(Some(chat)) if chat.messages.is_empty() => {
                debug!(chat_id = %chat.id, "resuming empty chat");
                self.chat_id = Some(chat.id);
                self.chat_title = chat.title;
                self.transcript.clear();
            }
            Ok(_) => {
                self.create_new_chat().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to read saved chats");
                self.create_new_chat().await;
            }
        }
    }

    /// Apply one command effect.
    pub async fn apply(&mut self, effect: Effect) -> Flow {
        match effect {
            Effect::None => {}
            Effect::Exit => return Flow::Exit,
            Effect::ClearTranscript => self.transcript.clear(),
            Effect::ClearTokenCounter => self.total_tokens = 0,
            Effect::ClearError => self.notice = None,
            Effect::SetError(message) => self.notice = Some(Notice::Error(message)),
            Effect::ReplaceTranscript(messages) => self.transcript = messages,
            Effect::AppendMessage(message) => self.transcript.push(message),
            Effect::ToggleHelp => self.help_visible = !self.help_visible,
            Effect::SetMode { mode, prompt } => {
                self.mode = mode;
                if prompt.is_some() {
                    self.pending_image_prompt = prompt;
                }
            }
            Effect::CreateNewChat => {
                self.create_new_chat().await;
            }
            Effect::SetChatId(id) => self.chat_id = Some(id),
            Effect::SetChatTitle(title) => self.chat_title = title,
            Effect::SetModel(model) => self.model = model,
            Effect::ShowInfo(message) => self.notice = Some(Notice::Info(message)),
        }
        Flow::Continue
    }

    /// Handle one line of input. Streamed reply fragments are passed to
    /// `on_content` as they arrive.
    pub async fn submit(&mut self, line: &str, on_content: &mut (dyn FnMut(&str) + Send)) -> Flow {
        let text = line.trim();
        if text.is_empty() {
            return Flow::Continue;
        }

        if is_command(text) {
            let flow = self.run_command(text).await;
            if flow == Flow::Continue && self.mode == ViewMode::ImageGenerator {
                if let Some(prompt) = self.pending_image_prompt.take() {
                    self.generate_images(&prompt).await;
                }
            }
            return flow;
        }

        match self.mode {
            ViewMode::ImageGenerator => self.generate_images(text).await,
            ViewMode::Chat => self.send_message(text, on_content).await,
        }
        Flow::Continue
    }

    async fn run_command(&mut self, line: &str) -> Flow {
        let Some(parsed) = parse_command(line) else {
            self.notice = Some(Notice::Error("Invalid command format".to_string()));
            return Flow::Continue;
        };

        let result = {
            let context = CommandContext {
                ai: self.ai.as_ref(),
                store: self.store.as_ref(),
                current_chat_id: self.chat_id.as_deref(),
                current_chat_title: &self.chat_title,
                current_model: &self.model,
                messages: &self.transcript,
                total_tokens: self.total_tokens,
                working_dir: &self.settings.working_dir,
            };
            self.registry
                .execute(&parsed.name, &parsed.args, &context)
                .await
        };
        debug!(command = %parsed.name, success = result.success, "command finished");

        for effect in result.actions {
            if self.apply(effect).await == Flow::Exit {
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    async fn create_new_chat(&mut self) -> bool {
        match self.store.create(None).await {
            Ok(chat) => {
                info!(chat_id = %chat.id, "started new chat");
                self.chat_id = Some(chat.id);
                self.chat_title = chat.title;
                self.transcript.clear();
                self.total_tokens = 0;
                self.notice = None;
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to create chat");
                self.notice = Some(Notice::Error("Failed to create new chat".to_string()));
                false
            }
        }
    }

    async fn save_message(&self, role: Role, content: &str) {
        let Some(chat_id) = self.chat_id.as_deref() else {
            return;
        };
        match self.store.add_message(chat_id, role, content).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(chat_id, "chat disappeared before the message was saved"),
            Err(err) => warn!(chat_id, error = %err, "failed to save message"),
        }
    }

    async fn update_title(&mut self, source: &str) {
        let Some(chat_id) = self.chat_id.clone() else {
            return;
        };
        let title = title_from_message(source);
        if title.is_empty() {
            return;
        }
        match self.store.rename(&chat_id, &title).await {
            Ok(Some(_)) => self.chat_title = title,
            Ok(None) => warn!(chat_id, "chat disappeared before it could be titled"),
            Err(err) => warn!(chat_id, error = %err, "failed to title chat"),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.working_dir.join(path)
        }
    }

    async fn send_message(&mut self, text: &str, on_content: &mut (dyn FnMut(&str) + Send)) {
        self.notice = None;

        if self.chat_id.is_none() && !self.create_new_chat().await {
            self.notice = Some(Notice::Error("Failed to create chat session".to_string()));
            return;
        }

        let reference = parse_file_reference(text);
        let mut attachment = None;
        let mut display = text.to_string();
        let mut cleaned = text.to_string();
        if let Some(reference) = reference {
            let path = self.resolve_path(&reference.path);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                self.notice = Some(Notice::Error(format!("File not found: {}", reference.path)));
                return;
            }
            if !is_supported_image(&path) {
                self.notice = Some(Notice::Error(UNSUPPORTED_FILE_MESSAGE.to_string()));
                return;
            }
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| reference.path.clone());
            display = format!("📎 {file_name}\n{}", reference.message);
            cleaned = reference.message;
            attachment = Some(ImageAttachment::File(path));
        }

        let first_message = self.transcript.is_empty();
        let mut history = self.transcript.clone();
        history.push(Message::user(text));

        self.transcript.push(Message::user(display.clone()));
        self.transcript.push(Message::assistant(""));
        self.save_message(Role::User, &display).await;

        if first_message {
            let source = if cleaned.is_empty() { text } else { cleaned.as_str() };
            self.update_title(source).await;
        }

        let stream = self.settings.stream;
        let outcome = match attachment {
            Some(image) => {
                let prompt = if cleaned.is_empty() {
                    DEFAULT_IMAGE_QUESTION.to_string()
                } else {
                    cleaned.clone()
                };
                let mut options =
                    VisionOptions::new(self.settings.vision_model.clone(), prompt, vec![image]);
                options.temperature = self.settings.sampling.temperature;
                options.max_tokens = self.settings.sampling.max_tokens;
                if stream {
                    self.ai.stream_vision(&options, on_content).await
                } else {
                    self.ai.vision(&options).await
                }
            }
            None => {
                let options = ChatOptions::new(self.model.clone(), history)
                    .with_sampling(&self.settings.sampling);
                if stream {
                    self.ai.stream_chat(&options, on_content).await
                } else {
                    self.ai.chat(&options).await
                }
            }
        };
        // Without streaming the whole reply arrives as one fragment.
        if let (false, Ok(result)) = (stream, &outcome) {
            on_content(&result.content);
        }

        match outcome {
            Ok(result) => {
                if let Some(placeholder) = self.transcript.last_mut() {
                    placeholder.content = result.content.clone();
                }
                if result.usage.total_tokens > 0 {
                    self.total_tokens += result.usage.total_tokens;
                }
                self.save_message(Role::Assistant, &result.content).await;
                debug!(
                    finish_reason = %result.finish_reason,
                    tokens = result.usage.total_tokens,
                    "reply complete"
                );
            }
            Err(err) => {
                warn!(error = %err, "completion failed");
                if self.transcript.last().is_some_and(Message::is_assistant) {
                    self.transcript.pop();
                }
                self.notice = Some(Notice::Error(err.to_string()));
            }
        }
    }

    async fn generate_images(&mut self, prompt: &str) {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return;
        }
        self.notice = None;

        let outcome = self
            .ai
            .generate_image(&self.settings.image_model, prompt)
            .await;
        self.mode = ViewMode::Chat;
        self.pending_image_prompt = None;

        let generated = match outcome {
            Ok(generated) => generated,
            Err(err) => {
                warn!(error = %err, "image generation failed");
                self.notice = Some(Notice::Error(format!("Image generation failed: {err}")));
                return;
            }
        };

        let saved = match self.save_images(&generated).await {
            Ok(saved) => saved,
            Err(err) => {
                warn!(error = %err, "failed to save generated images");
                self.notice = Some(Notice::Error(err.to_string()));
                return;
            }
        };

        if generated.usage.total_tokens > 0 {
            self.total_tokens += generated.usage.total_tokens;
        }

        let mut content = format!("🎨 Image generated successfully!\n{}", generated.text);
        for path in &saved {
            content.push_str(&format!("\n📁 Saved: {}", path.display()));
        }
        self.transcript.push(Message::assistant(content.clone()));
        self.save_message(Role::Assistant, &content).await;
    }

    async fn save_images(&self, generated: &GeneratedImages) -> Result<Vec<PathBuf>, ChatError> {
        let dir = self.settings.data_dir.join(IMAGES_DIR_NAME);
        let mut saved = Vec::with_capacity(generated.images.len());
        if generated.images.is_empty() {
            return Ok(saved);
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ChatError::Io {
                path: dir.clone(),
                source,
            })?;

        let stamp = Utc::now().timestamp_millis();
        for (index, url) in generated.images.iter().enumerate() {
            let Some((mime_type, bytes)) = decode_data_url(url) else {
                warn!(index, "generated image is not a base64 data URL");
                continue;
            };
            let extension = extension_for_mime_type(&mime_type).unwrap_or("png");
            let path = dir.join(format!("image_{stamp}_{index}.{extension}"));
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|source| ChatError::Io {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), "saved generated image");
            saved.push(path);
        }
        Ok(saved)
    }
}
