//! Shape checks applied to decoded payloads before any field is trusted.
//!
//! Serde enforces the structural schema; the functions here add the
//! semantic rules the structs cannot express (known roles, at least one
//! choice in a full response).

use thiserror::Error;

use crate::api::{ChatCompletionsResponse, ImageGenerationResponse, StreamingChunk};
use crate::core::message::Role;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contained no choices")]
    NoChoices,
    #[error("unexpected message role `{0}`")]
    UnknownRole(String),
}

fn check_role(role: &str) -> Result<(), ValidationError> {
    Role::try_from(role)
        .map(|_| ())
        .map_err(|_| ValidationError::UnknownRole(role.to_string()))
}

/// Validate one streamed event payload (the text after `data:`).
///
/// A chunk with an empty `choices` array is valid; it simply carries no delta.
pub fn validate_chunk(payload: &str) -> Result<StreamingChunk, ValidationError> {
    let chunk: StreamingChunk = serde_json::from_str(payload)?;
    for choice in &chunk.choices {
        if let Some(role) = choice.delta.role.as_deref() {
            check_role(role)?;
        }
    }
    Ok(chunk)
}

/// Validate a complete non-streaming completion body.
pub fn validate_completion(body: &[u8]) -> Result<ChatCompletionsResponse, ValidationError> {
    let response: ChatCompletionsResponse = serde_json::from_slice(body)?;
    if response.choices.is_empty() {
        return Err(ValidationError::NoChoices);
    }
    for choice in &response.choices {
        check_role(&choice.message.role)?;
    }
    Ok(response)
}

/// Validate an image generation body; the same rules as a completion minus
/// the mandatory usage block.
pub fn validate_image_generation(
    body: &[u8],
) -> Result<ImageGenerationResponse, ValidationError> {
    let response: ImageGenerationResponse = serde_json::from_slice(body)?;
    if response.choices.is_empty() {
        return Err(ValidationError::NoChoices);
    }
    for choice in &response.choices {
        check_role(&choice.message.role)?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_with_delta_content_is_accepted() {
        let chunk = validate_chunk(
            r#"{"id":"c1","created":1,"model":"m","choices":[{"index":0,"delta":{"role":"assistant","content":"He"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("He"));
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn chunk_without_choices_array_is_rejected() {
        assert!(matches!(
            validate_chunk(r#"{"id":"c1","object":"chat.completion.chunk"}"#),
            Err(ValidationError::Json(_))
        ));
    }

    #[test]
    fn truncated_chunk_is_rejected() {
        assert!(validate_chunk(r#"{"choices":[{"delta":{"content":"Hel"#).is_err());
    }

    #[test]
    fn chunk_with_unknown_role_is_rejected() {
        assert!(matches!(
            validate_chunk(r#"{"choices":[{"delta":{"role":"robot"}}]}"#),
            Err(ValidationError::UnknownRole(role)) if role == "robot"
        ));
    }

    #[test]
    fn completion_requires_usage_and_choices() {
        let missing_usage =
            br#"{"choices":[{"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}]}"#;
        assert!(validate_completion(missing_usage).is_err());

        let no_choices =
            br#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":0,"total_tokens":1}}"#;
        assert!(matches!(
            validate_completion(no_choices),
            Err(ValidationError::NoChoices)
        ));
    }

    #[test]
    fn completion_fields_are_exposed() {
        let body = br#"{"id":"x","object":"chat.completion","created":1,"model":"m","choices":[{"index":0,"message":{"role":"assistant","content":"hi"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;
        let response = validate_completion(body).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("hi"));
        assert_eq!(response.usage.total_tokens, 4);
    }
}
