//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::client::AiService;
use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::request::ChatOptions;

pub async fn run_say(
    prompt: Vec<String>,
    config: &Config,
    ai: &dyn AiService,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: parlance say <prompt>".into());
    }

    let options = ChatOptions::new(config.model(), vec![Message::user(prompt)])
        .with_sampling(&config.sampling());

    let mut stdout = io::stdout();
    if config.stream_enabled() {
        ai.stream_chat(&options, &mut |fragment: &str| {
            let mut out = io::stdout();
            let _ = out.write_all(fragment.as_bytes());
            let _ = out.flush();
        })
        .await?;
    } else {
        let result = ai.chat(&options).await?;
        write!(stdout, "{}", result.content)?;
    }
    writeln!(stdout)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::FakeAi;

    #[tokio::test]
    async fn say_sends_one_user_message_to_the_configured_model() {
        let ai = FakeAi::replying(&["ok"]);
        let config = Config {
            default_model: Some("openai/gpt-4o".to_string()),
            stream: Some(false),
            ..Config::default()
        };

        run_say(vec!["hello".into(), "there".into()], &config, &ai)
            .await
            .expect("say succeeds");

        let calls = ai.chat_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "openai/gpt-4o");
        assert_eq!(calls[0].messages, vec![Message::user("hello there")]);
    }

    #[tokio::test]
    async fn empty_prompt_is_a_usage_error() {
        let ai = FakeAi::default();
        let err = run_say(Vec::new(), &Config::default(), &ai)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Usage:"));
    }

    #[tokio::test]
    async fn api_failure_is_returned() {
        let ai = FakeAi::default();
        let result = run_say(vec!["hi".into()], &Config::default(), &ai).await;
        assert!(result.is_err());
    }
}
