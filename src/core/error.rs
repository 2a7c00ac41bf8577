use std::path::PathBuf;

use thiserror::Error;

use crate::api::validate::ValidationError;

/// Failures of the completion pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The service answered with a non-2xx status.
    #[error("API request failed ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A full (non-streaming) response did not match the expected shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(#[from] ValidationError),

    #[error("at least one image is required for vision chat")]
    MissingImages,

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ChatError {
    pub fn http(status: u16, body: &str) -> Self {
        ChatError::Http {
            status,
            body: summarize_api_error(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reduce an error body to a single readable line, preferring the
/// `error.message` field that OpenAI-compatible services send.
pub fn summarize_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let summary = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
                .or_else(|| match value.get("error") {
                    Some(serde_json::Value::String(s)) => Some(s.clone()),
                    _ => None,
                })
                .or_else(|| {
                    value
                        .get("message")
                        .and_then(|v| v.as_str().map(str::to_owned))
                })
        });

    let text = summary.as_deref().unwrap_or(trimmed);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_message_is_extracted() {
        let body = r#"{"error":{"message":"model   overloaded","type":"server_error"}}"#;
        assert_eq!(summarize_api_error(body), "model overloaded");
    }

    #[test]
    fn string_error_and_top_level_message_are_extracted() {
        assert_eq!(summarize_api_error(r#"{"error":"bad key"}"#), "bad key");
        assert_eq!(summarize_api_error(r#"{"message":"nope"}"#), "nope");
    }

    #[test]
    fn plain_text_bodies_are_collapsed() {
        assert_eq!(summarize_api_error("  upstream\n timeout "), "upstream timeout");
        assert_eq!(summarize_api_error(""), "<empty body>");
    }

    #[test]
    fn http_errors_carry_status_and_body() {
        let err = ChatError::http(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "API request failed (429): slow down");
    }
}
