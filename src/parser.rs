use lazy_static::lazy_static;
use regex::Regex;

pub const KB_SUGGESTION_MARKER: &str = "KB_SUGGESTION:";
pub const SEARCH_MARKER: &str = "SEARCH_INTERNET:";

lazy_static! {
    static ref KB_SUGGESTION_RE: Regex = Regex::new(r"(?i)KB_SUGGESTION:\s*([\s\S]+)")
        .expect("Failed to compile KB suggestion regex");

    static ref SEARCH_RE: Regex = Regex::new(r"(?i)^\s*SEARCH_INTERNET:\s*\[?([^\]\n]*)\]?")
        .expect("Failed to compile web search regex");

    static ref NON_WORD_RE: Regex = Regex::new(r"\W+")
        .expect("Failed to compile non-word regex");
}

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Exit,
    Ask(String),
    Help,
    History,
    KbSearch(String),
    Settings,
    Undo,
    Clear,
    Shell(String),
}

/// Classifies a raw input line. Meta-commands match case-insensitively;
/// anything else is passed through verbatim as a shell command.
pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "exit" | "quit" => return Input::Exit,
        "help" => return Input::Help,
        "history" => return Input::History,
        "settings" => return Input::Settings,
        "undo" => return Input::Undo,
        "clear" => return Input::Clear,
        "kb" => return Input::KbSearch(String::new()),
        _ => {}
    }

    if let Some(question) = strip_prefix_ignore_case(trimmed, "ai?") {
        return Input::Ask(question.trim().to_string());
    }
    if let Some(term) = strip_prefix_ignore_case(trimmed, "kb") {
        if term.starts_with(char::is_whitespace) {
            return Input::KbSearch(term.trim().to_string());
        }
    }
    Input::Shell(trimmed.to_string())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

/// Markers extracted from a model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    /// Text the model proposes to save to the knowledge base.
    pub kb_suggestion: Option<String>,
    /// Query the model asked to have searched on the web. Never acted on.
    pub search_query: Option<String>,
}

pub fn parse_reply(reply: &str) -> ParsedReply {
    let kb_suggestion = KB_SUGGESTION_RE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    let search_query = SEARCH_RE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    ParsedReply {
        kb_suggestion,
        search_query,
    }
}

/// Filename for a saved suggestion: the command's first token with runs of
/// non-word characters collapsed to `_`, plus a unix timestamp.
pub fn suggestion_filename(command: &str, unix_secs: i64) -> String {
    let first = command.split_whitespace().next().unwrap_or("");
    let base = NON_WORD_RE.replace_all(first, "_");
    let base = if base.is_empty() { "note" } else { base.as_ref() };
    format!("{}_{}.md", base, unix_secs)
}

/// Body written for a saved suggestion.
pub fn suggestion_content(command: &str, suggestion: &str) -> String {
    format!("# Command: {}\n\n{}", command, suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_commands() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("EXIT"), Input::Exit);
        assert_eq!(parse_input("quit"), Input::Exit);
        assert_eq!(parse_input("Help"), Input::Help);
        assert_eq!(parse_input("history"), Input::History);
        assert_eq!(parse_input("settings"), Input::Settings);
        assert_eq!(parse_input("UNDO"), Input::Undo);
        assert_eq!(parse_input("clear"), Input::Clear);
    }

    #[test]
    fn test_parse_ask_and_kb() {
        assert_eq!(
            parse_input("AI? what does -r do"),
            Input::Ask("what does -r do".to_string())
        );
        assert_eq!(parse_input("ai?"), Input::Ask(String::new()));
        assert_eq!(
            parse_input("kb Permission Denied"),
            Input::KbSearch("Permission Denied".to_string())
        );
        assert_eq!(parse_input("kb"), Input::KbSearch(String::new()));
    }

    #[test]
    fn test_parse_shell_passthrough() {
        assert_eq!(parse_input("ls -la"), Input::Shell("ls -la".to_string()));
        assert_eq!(parse_input("history | tail"), Input::Shell("history | tail".to_string()));
        assert_eq!(parse_input("kbd_mode"), Input::Shell("kbd_mode".to_string()));
        assert_eq!(parse_input("  cd /tmp "), Input::Shell("cd /tmp".to_string()));
    }

    #[test]
    fn test_parse_reply_with_suggestion() {
        let reply = "`ls` lists files.\n\nkb_suggestion:  Use `ls -lh` for human sizes.\n";
        let parsed = parse_reply(reply);
        assert_eq!(
            parsed.kb_suggestion.as_deref(),
            Some("Use `ls -lh` for human sizes.")
        );
        assert!(parsed.search_query.is_none());
    }

    #[test]
    fn test_parse_reply_without_markers() {
        assert_eq!(parse_reply("Nothing special here."), ParsedReply::default());
        assert_eq!(parse_reply("KB_SUGGESTION:   ").kb_suggestion, None);
    }

    #[test]
    fn test_parse_reply_search_marker() {
        let parsed = parse_reply("SEARCH_INTERNET: [rsync exit code 23]\nI need to look this up.");
        assert_eq!(parsed.search_query.as_deref(), Some("rsync exit code 23"));

        let parsed = parse_reply("Try man rsync. SEARCH_INTERNET: not at start");
        assert!(parsed.search_query.is_none());
    }

    #[test]
    fn test_suggestion_filename_sanitizes_first_token() {
        assert_eq!(suggestion_filename("ls -la", 1700000000), "ls_1700000000.md");
        assert_eq!(suggestion_filename("./build.sh --fast", 5), "_build_sh_5.md");
        assert_eq!(suggestion_filename("", 5), "note_5.md");
    }

    #[test]
    fn test_suggestion_content() {
        assert_eq!(
            suggestion_content("df -h", "Shows disk usage."),
            "# Command: df -h\n\nShows disk usage."
        );
    }
}
