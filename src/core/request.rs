//! Construction of outbound chat completion payloads.

use crate::api::{ChatMessage, ChatRequest, ContentPart, MessageContent};
use crate::core::attachment::{attachment_to_part, ImageAttachment};
use crate::core::error::ChatError;
use crate::core::message::{Message, Role};

/// Output modalities requested from image-capable models.
pub const IMAGE_MODALITIES: [&str; 2] = ["image", "text"];

const DEFAULT_VISION_PROMPT: &str = "What's in this image?";

/// Inputs of a text completion. Sampling fields left as `None` are not sent,
/// so the service applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

impl ChatOptions {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Self::default()
        }
    }

    pub fn with_sampling(mut self, sampling: &Sampling) -> Self {
        self.temperature = sampling.temperature;
        self.max_tokens = sampling.max_tokens;
        self.top_p = sampling.top_p;
        self
    }

    pub fn to_request(&self, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: self.messages.iter().map(ChatMessage::from).collect(),
            stream,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            modalities: None,
        }
    }
}

/// Optional sampling overrides shared by every request kind.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sampling {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

/// Inputs of an image-analysis completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionOptions {
    pub model: String,
    pub prompt: String,
    pub images: Vec<ImageAttachment>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl VisionOptions {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, images: Vec<ImageAttachment>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            images,
            ..Self::default()
        }
    }

    /// Build the request, reading any file attachments into data URLs.
    pub async fn to_request(&self, stream: bool) -> Result<ChatRequest, ChatError> {
        if self.images.is_empty() {
            return Err(ChatError::MissingImages);
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = self.system_prompt.as_deref() {
            messages.push(ChatMessage::from(&Message::system(system_prompt)));
        }

        let prompt = if self.prompt.trim().is_empty() {
            DEFAULT_VISION_PROMPT
        } else {
            self.prompt.as_str()
        };
        let mut parts = Vec::with_capacity(self.images.len() + 1);
        parts.push(ContentPart::Text {
            text: prompt.to_string(),
        });
        for image in &self.images {
            parts.push(attachment_to_part(image).await?);
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(parts),
        });

        Ok(ChatRequest {
            model: self.model.clone(),
            messages,
            stream,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: None,
            modalities: None,
        })
    }
}

/// Non-streaming request asking an image model for pictures plus text.
pub fn image_generation_request(model: &str, prompt: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::from(&Message::user(prompt))],
        stream: false,
        temperature: None,
        max_tokens: None,
        top_p: None,
        modalities: Some(IMAGE_MODALITIES.iter().map(|m| m.to_string()).collect()),
    }
}
