use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted user preferences. Every field is optional on disk; the
/// accessors in `defaults` fill in what is missing.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Root of the OpenAI-compatible API, e.g. `https://ai.hackclub.com/proxy/v1`
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub default_model: Option<String>,
    pub vision_model: Option<String>,
    pub image_model: Option<String>,
    /// Stream replies as they are generated
    pub stream: Option<bool>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    /// Where chats and generated images are kept
    pub data_dir: Option<PathBuf>,
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
