use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::api::{ModelInfo, Usage, UsageStats};
use crate::core::chat_stream::ChatResult;
use crate::core::client::{AiService, GeneratedImages};
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::request::{ChatOptions, VisionOptions};

/// A request captured by [`spawn_http_server`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

pub async fn read_http_request(
    stream: &mut tokio::net::TcpStream,
) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

pub fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

pub fn sse_response(events: &[&str]) -> String {
    let body: String = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect();
    http_response("200 OK", "text/event-stream", &body)
}

/// Serve each canned response to one connection, in order, then hand back
/// everything that was received.
pub async fn spawn_http_server(
    responses: Vec<String>,
) -> (String, JoinHandle<Result<Vec<CapturedRequest>, String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");

    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().await.map_err(|err| err.to_string())?;
            captured.push(read_http_request(&mut stream).await?);
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|err| err.to_string())?;
            stream.shutdown().await.map_err(|err| err.to_string())?;
        }
        Ok(captured)
    });

    (format!("http://{addr}/v1"), handle)
}

pub fn test_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client should build")
}

/// Scripted [`AiService`] for command and session tests.
#[derive(Default)]
pub struct FakeAi {
    pub models: Option<Vec<ModelInfo>>,
    pub stats: Option<UsageStats>,
    /// Fragments streamed back for every chat; `None` makes the call fail.
    pub reply: Option<Vec<String>>,
    pub usage: Usage,
    pub images: Option<GeneratedImages>,
    pub chat_calls: Mutex<Vec<ChatOptions>>,
    pub vision_calls: Mutex<Vec<VisionOptions>>,
    pub image_prompts: Mutex<Vec<String>>,
}

impl FakeAi {
    pub fn with_models(ids: &[&str]) -> Self {
        Self {
            models: Some(
                ids.iter()
                    .map(|id| ModelInfo {
                        id: id.to_string(),
                        name: None,
                        created: None,
                        context_length: None,
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            reply: Some(fragments.iter().map(|f| f.to_string()).collect()),
            ..Self::default()
        }
    }

    fn failure() -> ChatError {
        ChatError::http(503, r#"{"error":{"message":"service unavailable"}}"#)
    }

    fn stream_reply(
        &self,
        on_content: &mut (dyn FnMut(&str) + Send),
    ) -> Result<ChatResult, ChatError> {
        let fragments = self.reply.clone().ok_or_else(Self::failure)?;
        for fragment in &fragments {
            on_content(fragment);
        }
        Ok(ChatResult {
            content: fragments.concat(),
            usage: self.usage,
            finish_reason: "stop".to_string(),
        })
    }

    pub fn last_chat_messages(&self) -> Vec<Message> {
        self.chat_calls
            .lock()
            .expect("lock")
            .last()
            .map(|options| options.messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AiService for FakeAi {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        self.models.clone().ok_or_else(Self::failure)
    }

    async fn usage_stats(&self) -> Result<UsageStats, ChatError> {
        self.stats.ok_or_else(Self::failure)
    }

    async fn chat(&self, options: &ChatOptions) -> Result<ChatResult, ChatError> {
        self.chat_calls.lock().expect("lock").push(options.clone());
        self.stream_reply(&mut |_: &str| {})
    }

    async fn stream_chat(
        &self,
        options: &ChatOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.chat_calls.lock().expect("lock").push(options.clone());
        self.stream_reply(on_content)
    }

    async fn vision(&self, options: &VisionOptions) -> Result<ChatResult, ChatError> {
        self.vision_calls.lock().expect("lock").push(options.clone());
        self.stream_reply(&mut |_: &str| {})
    }

    async fn stream_vision(
        &self,
        options: &VisionOptions,
        on_content: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ChatResult, ChatError> {
        self.vision_calls.lock().expect("lock").push(options.clone());
        self.stream_reply(on_content)
    }

    async fn generate_image(
        &self,
        _model: &str,
        prompt: &str,
    ) -> Result<GeneratedImages, ChatError> {
        self.image_prompts
            .lock()
            .expect("lock")
            .push(prompt.to_string());
        self.images.clone().ok_or_else(Self::failure)
    }
}
