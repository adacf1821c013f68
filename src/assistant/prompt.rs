use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::commands::HistoryEntry;
use crate::knowledge::SearchHit;

const PROMPT_TEMPLATE_NAME: &str = "assistance";

const PROMPT_TEMPLATE: &str = r#"You are an AI Linux Co-Pilot. Your goal is to help the user understand Linux commands and their output, suggest improvements, and provide learning assistance.
--- Recent Command History (if any) ---
{{#each history}}
Cmd: {{command}}
Output: {{stdout}}
Error: {{stderr}}
---
{{/each}}
--- Current Interaction ---
User executed: `{{command}}`
{{#if stdout}}
STDOUT:
```
{{stdout}}
```
{{/if}}
{{#if stderr}}
STDERR:
```
{{stderr}}
```
{{/if}}
{{#if question}}
User's specific question: "{{question}}"
{{/if}}
{{#if snippets}}

--- Relevant Information from Local Knowledge Base ---
{{#each snippets}}
File: {{filename}}
Snippet: {{snippet}}
---
{{/each}}
{{/if}}

--- Your Task ---
1. Briefly explain the executed command (`{{command}}`). Focus on the options used if any.
2. Interpret the STDOUT and STDERR. Highlight key information or error causes.
3. Suggest potential next steps or related commands the user might find useful.
4. If there was an error, suggest common fixes or troubleshooting steps. Check the KB snippets first.
5. If the user asked a question, answer it directly in context.
6. If relevant, mention if a more efficient command or alternative tool exists for the task.
7. OPTIONAL: If you have high confidence and the information is not sensitive, suggest a useful snippet or explanation that could be saved to the local Knowledge Base. Prefix it with '{{suggestion_marker}}'. The user will confirm saving.
8. Keep your response concise, helpful, and easy to understand. Use Markdown for formatting.
9. If you need to search the internet for up-to-date information (e.g., man pages, specific error codes), indicate this by starting your response with `{{search_marker}} [search query]`.
"#;

#[derive(Serialize)]
struct HistoryView<'a> {
    command: &'a str,
    stdout: &'a str,
    stderr: &'a str,
}

#[derive(Serialize)]
struct PromptContext<'a> {
    history: Vec<HistoryView<'a>>,
    command: &'a str,
    stdout: &'a str,
    stderr: &'a str,
    question: Option<&'a str>,
    snippets: &'a [SearchHit],
    suggestion_marker: &'a str,
    search_marker: &'a str,
}

/// Everything the prompt describes about the current turn.
pub struct PromptInput<'a> {
    pub history: &'a [HistoryEntry],
    pub command: &'a str,
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub question: Option<&'a str>,
    pub snippets: &'a [SearchHit],
}

/// Renders the assistance prompt.
pub struct PromptBuilder {
    handlebars: Handlebars<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(PROMPT_TEMPLATE_NAME, PROMPT_TEMPLATE)
            .context("Failed to register assistance prompt template")?;
        Ok(Self { handlebars })
    }

    pub fn render(&self, input: &PromptInput<'_>) -> Result<String> {
        let history = input
            .history
            .iter()
            .map(|entry| HistoryView {
                command: &entry.command,
                stdout: or_placeholder(&entry.stdout, "(no stdout)"),
                stderr: or_placeholder(&entry.stderr, "(no stderr)"),
            })
            .collect();
        let context = PromptContext {
            history,
            command: input.command,
            stdout: input.stdout.trim(),
            stderr: input.stderr.trim(),
            question: input.question.filter(|q| !q.trim().is_empty()),
            snippets: input.snippets,
            suggestion_marker: crate::parser::KB_SUGGESTION_MARKER,
            search_marker: crate::parser::SEARCH_MARKER,
        };
        self.handlebars
            .render(PROMPT_TEMPLATE_NAME, &context)
            .context("Failed to render assistance prompt")
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(command: &str, stdout: &str, stderr: &str) -> HistoryEntry {
        HistoryEntry {
            command: command.to_string(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_prompt_includes_history_and_placeholders() {
        let builder = PromptBuilder::new().unwrap();
        let history = vec![entry("ls", "a.txt\n", ""), entry("cat missing", "", "No such file")];
        let prompt = builder
            .render(&PromptInput {
                history: &history,
                command: "grep -r foo .",
                stdout: "  ./a.txt: foo  \n",
                stderr: "",
                question: None,
                snippets: &[],
            })
            .unwrap();

        assert!(prompt.starts_with("You are an AI Linux Co-Pilot."));
        assert!(prompt.contains("Cmd: ls\nOutput: a.txt\n"));
        assert!(prompt.contains("Error: (no stderr)"));
        assert!(prompt.contains("Output: (no stdout)"));
        assert!(prompt.contains("User executed: `grep -r foo .`"));
        assert!(prompt.contains("STDOUT:\n```\n./a.txt: foo\n```"));
        assert!(!prompt.contains("STDERR:"));
        assert!(!prompt.contains("User's specific question"));
        assert!(!prompt.contains("Relevant Information from Local Knowledge Base"));
    }

    #[test]
    fn test_prompt_lists_tasks_question_and_snippets() {
        let builder = PromptBuilder::new().unwrap();
        let snippets = vec![SearchHit {
            category: "general".to_string(),
            filename: "perm.md".to_string(),
            snippet: "use sudo <cmd>...".to_string(),
        }];
        let prompt = builder
            .render(&PromptInput {
                history: &[],
                command: "rm /etc/hosts",
                stdout: "",
                stderr: "Permission denied",
                question: Some("why can't I delete this?"),
                snippets: &snippets,
            })
            .unwrap();

        assert!(prompt.contains("STDERR:\n```\nPermission denied\n```"));
        assert!(prompt.contains("User's specific question: \"why can't I delete this?\""));
        assert!(prompt.contains("File: perm.md\nSnippet: use sudo <cmd>..."));
        assert!(prompt.contains("Prefix it with 'KB_SUGGESTION:'"));
        assert!(prompt.contains("starting your response with `SEARCH_INTERNET: [search query]`"));
        for n in 1..=9 {
            assert!(prompt.contains(&format!("\n{}. ", n)), "task {} missing", n);
        }
    }
}
