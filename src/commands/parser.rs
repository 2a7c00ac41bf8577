//! Slash-command recognition and shell-like argument splitting.

/// Leading character that marks a line as a command.
pub const COMMAND_MARKER: char = '/';

/// A command line split into its name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased, never empty.
    pub name: String,
    pub args: Vec<String>,
    /// The input exactly as given.
    pub raw: String,
}

pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with(COMMAND_MARKER)
}

/// Parse `/<name> [args...]`. Ordinary chat text, and a bare marker, yield
/// `None`.
pub fn parse_command(input: &str) -> Option<ParsedCommand> {
    let trimmed = input.trim();
    let rest = trimmed.strip_prefix(COMMAND_MARKER)?;

    let mut tokens = tokenize(rest).into_iter();
    let name = tokens.next()?.to_lowercase();
    Some(ParsedCommand {
        name,
        args: tokens.collect(),
        raw: input.to_string(),
    })
}

/// Split on whitespace, honouring `'...'` / `"..."` spans and the escapes
/// `\"`, `\'` and `\\`.
///
/// An escape is recognised inside and outside quotes. A quote of the other
/// kind inside a quoted span is literal. An unterminated quote swallows the
/// rest of the input into the open token instead of failing.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '"' | '\'' | '\\') {
                    current.push(next);
                    chars.next();
                    continue;
                }
            }
        }

        match (ch, quote) {
            ('"' | '\'', None) => quote = Some(ch),
            (c, Some(open)) if c == open => quote = None,
            (c, None) if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            (c, _) => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Rejoin arguments with single spaces, e.g. for titles and prompts.
pub fn join_args(args: &[String]) -> String {
    args.join(" ")
}
