use super::*;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }
}

use test_helpers::parse_args;

#[test]
fn test_default_command_is_chat() {
    let args = parse_args(&["parlance"]);
    assert!(args.command.is_none());
    assert!(!args.no_stream);
    assert!(!args.verbose);

    let args = parse_args(&["parlance", "chat"]);
    assert!(matches!(args.command, Some(Commands::Chat)));
}

#[test]
fn test_model_flag_parsing() {
    let cases: [(&[&str], Option<&str>); 4] = [
        (&["parlance", "-m", "openai/gpt-4o"], Some("openai/gpt-4o")),
        (&["parlance", "--model", "qwen/qwen3-32b"], Some("qwen/qwen3-32b")),
        (&["parlance", "models", "-m", "x"], Some("x")),
        (&["parlance"], None),
    ];

    for (argv, expected) in cases {
        let args = parse_args(argv);
        assert_eq!(
            args.model.as_deref(),
            expected,
            "unexpected model when parsing argv={argv:?}"
        );
    }
}

#[test]
fn test_say_collects_prompt_words() {
    let args = parse_args(&["parlance", "say", "--no-stream", "what", "is", "-1?"]);
    assert!(args.no_stream);
    match args.command {
        Some(Commands::Say { prompt }) => assert_eq!(prompt, vec!["what", "is", "-1?"]),
        _ => panic!("expected say subcommand"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let args = parse_args(&["parlance", "models", "--base-url", "http://localhost:8080/v1", "-v"]);
    assert!(matches!(args.command, Some(Commands::Models)));
    assert_eq!(args.base_url.as_deref(), Some("http://localhost:8080/v1"));
    assert!(args.verbose);
}

#[test]
fn test_set_default_model_takes_a_model_id() {
    let args = parse_args(&["parlance", "set-default-model", "openai/gpt-4o"]);
    match args.command {
        Some(Commands::SetDefaultModel { model }) => assert_eq!(model, "openai/gpt-4o"),
        _ => panic!("expected set-default-model subcommand"),
    }
    assert!(Args::try_parse_from(["parlance", "set-default-model"]).is_err());
}

#[test]
fn test_unknown_subcommand_is_rejected() {
    assert!(Args::try_parse_from(["parlance", "auth"]).is_err());
}

#[test]
fn test_overrides_replace_config_values() {
    let mut config = Config {
        default_model: Some("from-file".to_string()),
        stream: Some(true),
        ..Config::default()
    };
    let args = parse_args(&[
        "parlance",
        "-m",
        " openai/gpt-4o ",
        "--base-url",
        "http://localhost:1234/v1",
        "--no-stream",
    ]);

    apply_overrides(&mut config, &args);

    assert_eq!(config.model(), "openai/gpt-4o");
    assert_eq!(config.base_url(), "http://localhost:1234/v1");
    assert!(!config.stream_enabled());
}

#[test]
fn test_blank_overrides_keep_config_values() {
    let mut config = Config {
        default_model: Some("from-file".to_string()),
        ..Config::default()
    };
    let args = parse_args(&["parlance", "-m", "  "]);

    apply_overrides(&mut config, &args);

    assert_eq!(config.model(), "from-file");
    assert!(config.stream_enabled());
}
