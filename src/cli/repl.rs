//! Line-oriented interactive chat on stdin/stdout.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::commands::{builtin_registry, Effect, ViewMode};
use crate::core::client::AiClient;
use crate::core::config::Config;
use crate::core::session::{Flow, Notice, Session, SessionSettings};
use crate::core::store::JsonChatStore;

fn prompt_for(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Chat => "> ",
        ViewMode::ImageGenerator => "🎨 prompt> ",
    }
}

fn print_notice(notice: Notice) {
    match notice {
        Notice::Info(text) => println!("{text}"),
        Notice::Error(text) => eprintln!("❌ {text}"),
    }
}

pub async fn run_chat(config: &Config, client: AiClient) -> Result<(), Box<dyn Error>> {
    let data_dir = config.resolve_data_dir()?;
    tokio::fs::create_dir_all(&data_dir).await?;
    let working_dir = std::env::current_dir()?;

    let store = JsonChatStore::in_dir(&data_dir);
    info!(path = %store.path().display(), "using chat store");
    let settings = SessionSettings::from_config(config, data_dir, working_dir);
    let mut session = Session::new(
        builtin_registry()?,
        Arc::new(client),
        Arc::new(store),
        settings,
    );
    session.startup().await;
    if let Some(notice) = session.take_notice() {
        print_notice(notice);
    }

    eprintln!("💬 Parlance: chatting with {}", session.model());
    eprintln!("   Type /help for commands, /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "{}", prompt_for(session.mode()))?;
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let before = session.transcript().len();
        let mut streamed = false;
        let flow = session
            .submit(&line, &mut |fragment: &str| {
                streamed = true;
                let mut out = io::stdout();
                let _ = out.write_all(fragment.as_bytes());
                let _ = out.flush();
            })
            .await;

        if streamed {
            println!();
        } else if session.transcript().len() > before {
            if let Some(message) = session.transcript().last().filter(|m| m.is_assistant()) {
                println!("{}", message.content);
            }
        }

        if session.help_visible() {
            println!("{}", session.help_text());
            session.apply(Effect::ToggleHelp).await;
        }
        if let Some(notice) = session.take_notice() {
            print_notice(notice);
        }

        if flow == Flow::Exit {
            break;
        }
    }

    Ok(())
}
