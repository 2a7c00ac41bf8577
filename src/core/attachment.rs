//! Image attachments: `@file:` references in user input, data URL encoding
//! for vision requests, and decoding of generated images.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::api::{ContentPart, ImageUrl};
use crate::core::error::ChatError;

const FALLBACK_MIME: &str = "image/png";

/// Where the bytes of an image come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAttachment {
    Url(String),
    File(PathBuf),
    /// Raw base64, or an already formed `data:` URL.
    Base64 {
        data: String,
        mime_type: Option<String>,
    },
}

pub fn mime_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

pub fn extension_for_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_type_for_extension)
}

pub fn is_supported_image(path: &Path) -> bool {
    mime_type_for_path(path).is_some()
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Read an image file into a `data:<mime>;base64,...` URL. Only the
/// extensions [`mime_type_for_extension`] knows are accepted.
pub async fn file_to_data_url(path: &Path) -> Result<String, ChatError> {
    let absolute = resolve(path);
    let bytes = tokio::fs::read(&absolute).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ChatError::FileNotFound(path.to_path_buf())
        } else {
            ChatError::Io {
                path: absolute.clone(),
                source,
            }
        }
    })?;
    let mime_type = mime_type_for_path(path)
        .ok_or_else(|| ChatError::UnsupportedImage(path.display().to_string()))?;
    Ok(format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)))
}

pub async fn attachment_to_part(attachment: &ImageAttachment) -> Result<ContentPart, ChatError> {
    let url = match attachment {
        ImageAttachment::Url(url) => url.clone(),
        ImageAttachment::File(path) => file_to_data_url(path).await?,
        ImageAttachment::Base64 { data, mime_type } => {
            if data.starts_with("data:") {
                data.clone()
            } else {
                let mime_type = mime_type.as_deref().unwrap_or(FALLBACK_MIME);
                format!("data:{mime_type};base64,{data}")
            }
        }
    };
    Ok(ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    })
}

/// A user message with an `@file:` reference pulled out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: String,
    pub message: String,
}

fn file_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r#"@file:"([^"]+)""#).expect("valid double-quoted pattern"),
            Regex::new(r"@file:'([^']+)'").expect("valid single-quoted pattern"),
            Regex::new(r"@file:(\S+)").expect("valid bare pattern"),
        ]
    })
}

/// Find the first `@file:path`, `@file:"path"` or `@file:'path'` reference.
/// Quoted forms take precedence so paths with spaces survive.
pub fn parse_file_reference(message: &str) -> Option<FileReference> {
    file_patterns().iter().find_map(|pattern| {
        let captures = pattern.captures(message)?;
        let whole = captures.get(0)?;
        let path = captures.get(1)?.as_str().to_string();
        let mut cleaned = String::with_capacity(message.len());
        cleaned.push_str(&message[..whole.start()]);
        cleaned.push_str(&message[whole.end()..]);
        Some(FileReference {
            path,
            message: cleaned.trim().to_string(),
        })
    })
}

/// Decode a base64 `data:` URL into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type.to_string(), bytes))
}
