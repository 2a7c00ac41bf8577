//! HTTP client for the OpenAI-compatible completions service.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::models::{fetch_models, fetch_usage_stats, sort_models};
use crate::api::validate::{validate_completion, validate_image_generation, ValidationError};
use crate::api::{ChatRequest, ModelInfo, Usage, UsageStats};
use crate::core::chat_stream::{decode_stream, ChatResult};
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::request::{image_generation_request, ChatOptions, VisionOptions};
use crate::utils::url::construct_api_url;

const UNKNOWN_FINISH_REASON: &str = "unknown";

/// Text and images returned by an image-capable model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedImages {
    pub text: String,
    /// Image URLs as returned, normally `data:` URLs.
    pub images: Vec<String>,
    pub usage: Usage,
}

/// The AI operations commands and the session depend on.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError>;

    async fn usage_stats(&self) -> Result<UsageStats, ChatError>;

    async fn chat(&self, options: &ChatOptions) -> Result<ChatResult, ChatError>;

    /// Stream a completion, handing each fragment to `on_content` as it
    /// arrives.
    async fn stream_chat(
        &self,
        options: &ChatOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError>;

    async fn vision(&self, options: &VisionOptions) -> Result<ChatResult, ChatError>;

    async fn stream_vision(
        &self,
        options: &VisionOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError>;

    async fn generate_image(&self, model: &str, prompt: &str)
        -> Result<GeneratedImages, ChatError>;
}

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ChatError> {
        let url = construct_api_url(&self.base_url, "chat/completions");
        debug!(%url, model = %request.model, stream = request.stream, "Posting completion request");
        let mut builder = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request);
        if request.stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::http(status, &body));
        }
        Ok(response)
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResult, ChatError> {
        let body = self.post(request).await?.bytes().await?;
        let response = validate_completion(&body)?;
        let usage = response.usage;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ValidationError::NoChoices)?;
        Ok(ChatResult {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice
                .finish_reason
                .unwrap_or_else(|| UNKNOWN_FINISH_REASON.to_string()),
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_content: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ChatResult, ChatError> {
        let response = self.post(request).await?;
        let result = decode_stream(Box::pin(response.bytes_stream()), on_content).await?;
        info!(
            finish_reason = %result.finish_reason,
            content_len = result.content.len(),
            "Completion streamed"
        );
        Ok(result)
    }

    pub async fn chat_stream(
        &self,
        options: &ChatOptions,
        on_content: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.stream(&options.to_request(true), on_content).await
    }

    pub async fn vision_chat(&self, options: &VisionOptions) -> Result<ChatResult, ChatError> {
        self.complete(&options.to_request(false).await?).await
    }

    pub async fn vision_chat_stream(
        &self,
        options: &VisionOptions,
        on_content: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.stream(&options.to_request(true).await?, on_content).await
    }

    /// One-shot, non-streaming question with an optional system prompt.
    pub async fn simple_chat(
        &self,
        model: &str,
        user: &str,
        system: Option<&str>,
    ) -> Result<String, ChatError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(user));
        let result = self.chat(&ChatOptions::new(model, messages)).await?;
        Ok(result.content)
    }
}

#[async_trait]
impl AiService for AiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        let mut models = fetch_models(&self.http, &self.base_url, &self.api_key)
            .await?
            .data;
        sort_models(&mut models);
        Ok(models)
    }

    async fn usage_stats(&self) -> Result<UsageStats, ChatError> {
        fetch_usage_stats(&self.http, &self.base_url, &self.api_key).await
    }

    async fn chat(&self, options: &ChatOptions) -> Result<ChatResult, ChatError> {
        self.complete(&options.to_request(false)).await
    }

    async fn stream_chat(
        &self,
        options: &ChatOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.chat_stream(options, on_content).await
    }

    async fn vision(&self, options: &VisionOptions) -> Result<ChatResult, ChatError> {
        self.vision_chat(options).await
    }

    async fn stream_vision(
        &self,
        options: &VisionOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.vision_chat_stream(options, on_content).await
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedImages, ChatError> {
        let request = image_generation_request(model, prompt);
        let body = self.post(&request).await?.bytes().await?;
        let response = validate_image_generation(&body)?;

        let mut generated = GeneratedImages {
            usage: response.usage.unwrap_or_default(),
            ..GeneratedImages::default()
        };
        if let Some(choice) = response.choices.into_iter().next() {
            generated.text = choice.message.content.unwrap_or_default();
            generated.images = choice
                .message
                .images
                .into_iter()
                .map(|image| image.image_url.url)
                .collect();
        }
        debug!(images = generated.images.len(), "Image generation finished");
        Ok(generated)
    }
}
