use std::borrow::Cow;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Context as RustylineContext;
use rustyline::Helper;

use crate::styling::STYLER;

const META_COMMANDS: &[&str] = &["ai?", "help", "history", "kb", "settings", "undo", "clear", "exit", "quit"];

/// Rustyline helper: colours the prompt and hints/completes meta-commands.
pub struct CopilotHelper {
    privileged: bool,
}

impl CopilotHelper {
    pub fn new(privileged: bool) -> Self {
        Self { privileged }
    }
}

impl Helper for CopilotHelper {}

impl Highlighter for CopilotHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, _default: bool) -> Cow<'b, str> {
        Cow::Owned(STYLER.prompt_style(prompt, self.privileged).to_string())
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(STYLER.dim_gray_style(hint).to_string())
    }
}

impl Validator for CopilotHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Hinter for CopilotHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &RustylineContext) -> Option<Self::Hint> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        match line {
            "kb" => Some(" <search term>".to_string()),
            "ai?" => Some(" <question>".to_string()),
            _ => complete_word(line)
                .into_iter()
                .next()
                .filter(|cmd| cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string()),
        }
    }
}

impl Completer for CopilotHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &RustylineContext) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let typed = &line[..pos];
        if typed.contains(char::is_whitespace) {
            return Ok((0, Vec::new()));
        }
        let candidates = complete_word(typed)
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

/// Meta-commands starting with `prefix` (ASCII case-insensitive).
fn complete_word(prefix: &str) -> Vec<&'static str> {
    let lower = prefix.to_ascii_lowercase();
    META_COMMANDS
        .iter()
        .copied()
        .filter(|cmd| !lower.is_empty() && cmd.starts_with(lower.as_str()))
        .collect()
}
