use crate::core::config::data::Config;
use crate::core::request::Sampling;

pub const DEFAULT_BASE_URL: &str = "https://ai.hackclub.com/proxy/v1";
pub const DEFAULT_API_KEY_ENV: &str = "PARLANCE_API_KEY";
pub const DEFAULT_MODEL: &str = "qwen/qwen3-32b";
pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "google/gemini-2.5-flash-image-preview";

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(DEFAULT_VISION_MODEL)
    }

    pub fn image_model(&self) -> &str {
        self.image_model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    pub fn stream_enabled(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn sampling(&self) -> Sampling {
        Sampling {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }
}
