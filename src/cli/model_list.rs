//! Model listing functionality
//!
//! Prints the models the configured API offers, newest first.

use std::error::Error;

use chrono::{DateTime, Utc};

use crate::api::ModelInfo;
use crate::core::client::AiService;
use crate::core::config::Config;

/// Timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: u64 = 10_000_000_000;

fn format_created(created: u64) -> Option<String> {
    if created == 0 {
        return None;
    }
    let secs = if created > MILLIS_THRESHOLD {
        created / 1000
    } else {
        created
    };
    let secs = i64::try_from(secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

pub fn describe_model(model: &ModelInfo, default_model: &str) -> Vec<String> {
    let marker = if model.id == default_model { " (default)" } else { "" };
    let mut lines = vec![format!("  • {}{marker}", model.id)];
    if let Some(name) = model.name.as_deref() {
        if !name.is_empty() && name != model.id {
            lines.push(format!("    Name: {name}"));
        }
    }
    if let Some(context_length) = model.context_length {
        lines.push(format!("    Context: {context_length} tokens"));
    }
    if let Some(created) = model.created.and_then(format_created) {
        lines.push(format!("    Created: {created}"));
    }
    lines
}

pub async fn list_models(config: &Config, ai: &dyn AiService) -> Result<(), Box<dyn Error>> {
    println!("🤖 Available Models at {}", config.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    let models = ai.list_models().await?;
    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    println!("Found {} models (sorted newest first):", models.len());
    println!();
    for model in &models {
        for line in describe_model(model, config.model()) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Check `requested` against the catalog and record its canonical id as the
/// default model in `stored`.
pub async fn choose_default_model(
    requested: &str,
    ai: &dyn AiService,
    stored: &mut Config,
) -> Result<String, Box<dyn Error>> {
    let requested = requested.trim();
    let models = ai.list_models().await?;
    let model = models
        .iter()
        .find(|model| model.id.eq_ignore_ascii_case(requested))
        .ok_or_else(|| {
            format!("Model \"{requested}\" not found. Run 'parlance models' to see available models.")
        })?;
    stored.default_model = Some(model.id.clone());
    Ok(model.id.clone())
}

/// Persist a new default model. The file is reloaded so command-line
/// overrides of this run are not written back.
pub async fn set_default_model(requested: &str, ai: &dyn AiService) -> Result<(), Box<dyn Error>> {
    let mut stored = Config::load()?;
    let model = choose_default_model(requested, ai, &mut stored).await?;
    stored.save()?;
    println!("✅ Set default-model to: {model}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::FakeAi;

    fn model(id: &str) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            name: None,
            created: None,
            context_length: None,
        }
    }

    #[test]
    fn created_accepts_seconds_and_milliseconds() {
        assert_eq!(
            format_created(1_700_000_000).as_deref(),
            Some("2023-11-14 22:13:20 UTC")
        );
        assert_eq!(format_created(1_700_000_000_000), format_created(1_700_000_000));
        assert_eq!(format_created(0), None);
    }

    #[test]
    fn description_marks_default_and_skips_redundant_name() {
        let mut info = model("qwen/qwen3-32b");
        info.name = Some("qwen/qwen3-32b".to_string());
        info.context_length = Some(32_768);

        let lines = describe_model(&info, "qwen/qwen3-32b");
        assert_eq!(
            lines,
            vec![
                "  • qwen/qwen3-32b (default)".to_string(),
                "    Context: 32768 tokens".to_string(),
            ]
        );
        assert_eq!(describe_model(&model("other"), "qwen/qwen3-32b"), vec!["  • other"]);
    }

    #[tokio::test]
    async fn default_model_is_matched_against_the_catalog() {
        let ai = FakeAi::with_models(&["openai/gpt-4o", "qwen/qwen3-32b"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut stored = Config {
            temperature: Some(0.2),
            ..Config::default()
        };

        let chosen = choose_default_model(" OpenAI/GPT-4o ", &ai, &mut stored)
            .await
            .unwrap();
        assert_eq!(chosen, "openai/gpt-4o");
        stored.save_to_path(&path).unwrap();

        let reloaded = Config::load_from_path(&path).unwrap();
        assert_eq!(reloaded.model(), "openai/gpt-4o");
        assert_eq!(reloaded.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn unknown_default_model_leaves_config_alone() {
        let ai = FakeAi::with_models(&["qwen/qwen3-32b"]);
        let mut stored = Config::default();

        let err = choose_default_model("gpt-5", &ai, &mut stored)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(stored.default_model, None);
    }
}
