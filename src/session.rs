// session.rs
// Session state for the co-pilot: history, working directory, cooldown, and
// the components each turn is dispatched to.
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::assistant::{AssistRequest, Assistant, Cooldown, ModelClient};
use crate::commands::{CommandHistory, CommandOutcome, CommandProcessor, HistoryEntry};
use crate::config::Settings;
use crate::knowledge::{KnowledgeStore, SearchHit, SUGGESTION_CATEGORY};
use crate::parser;

/// One interactive co-pilot session.
pub struct CopilotSession<M> {
    settings: Settings,
    store: KnowledgeStore,
    processor: CommandProcessor,
    assistant: Assistant<M>,
    history: CommandHistory,
    cooldown: Cooldown,
    cwd: PathBuf,
}

impl<M: ModelClient> CopilotSession<M> {
    pub fn new(settings: Settings, client: Option<M>, cwd: PathBuf) -> Result<Self> {
        let store = KnowledgeStore::new(settings.kb_root.clone());
        store.ensure()?;
        let assistant = Assistant::new(
            client,
            store.clone(),
            settings.history_window,
            settings.kb_excerpts,
        )?;
        Ok(Self {
            cooldown: Cooldown::new(settings.cooldown),
            settings,
            store,
            processor: CommandProcessor::new(),
            assistant,
            history: CommandHistory::new(),
            cwd,
        })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    #[cfg(test)]
    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Runs a shell line, adopts any directory change, and records it.
    pub async fn run_command(&mut self, line: &str) -> CommandOutcome {
        let outcome = self.processor.execute(line, &self.cwd).await;
        if outcome.cwd != self.cwd {
            log::info!("Working directory changed to {}", outcome.cwd.display());
            self.cwd = outcome.cwd.clone();
        }
        self.history.push(HistoryEntry {
            command: line.trim().to_string(),
            stdout: outcome.stdout.clone(),
            stderr: outcome.stderr.clone(),
        });
        outcome
    }

    /// Drops the most recent history entry. Effects on disk are not reverted.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let removed = self.history.undo();
        if let Some(entry) = &removed {
            log::info!("Undid command: {}", entry.command);
        }
        removed
    }

    /// Automatic assistance runs only with a key and outside a throttle.
    pub fn should_auto_assist(&self) -> bool {
        self.assistant.is_configured() && !self.cooldown.is_throttled()
    }

    pub fn is_throttled(&self) -> bool {
        self.cooldown.is_throttled()
    }

    /// Asks about the most recent command, optionally with a user question.
    /// With an empty history the question is asked on its own.
    pub async fn assist_last(&mut self, question: Option<&str>) -> String {
        let (last, earlier) = match self.history.entries().split_last() {
            Some((last, earlier)) => (Some(last), earlier),
            None => (None, &[][..]),
        };
        let request = AssistRequest {
            history: earlier,
            command: last.map_or("", |e| e.command.as_str()),
            stdout: last.map_or("", |e| e.stdout.as_str()),
            stderr: last.map_or("", |e| e.stderr.as_str()),
            question,
        };
        self.assistant.assist(&mut self.cooldown, &request).await
    }

    /// Searches every knowledge category for any whitespace-separated term.
    pub fn search_kb(&self, query: &str) -> Vec<SearchHit> {
        let terms: Vec<&str> = query.split_whitespace().collect();
        self.store.search_all(&terms)
    }

    /// Persists a confirmed model suggestion under `ai_suggestions`.
    pub fn save_suggestion(&self, command: &str, suggestion: &str) -> Result<PathBuf> {
        let filename = parser::suggestion_filename(command, chrono::Utc::now().timestamp());
        self.store.save(
            &filename,
            &parser::suggestion_content(command, suggestion),
            SUGGESTION_CATEGORY,
        )
    }

    /// Saves `suggestion` for the latest command when `answer` is `y`.
    /// Any other answer saves nothing.
    pub fn accept_suggestion(&self, suggestion: &str, answer: &str) -> Result<Option<PathBuf>> {
        if !answer.trim().eq_ignore_ascii_case("y") {
            log::info!("KB suggestion declined");
            return Ok(None);
        }
        let command = self.history.last().map_or("", |e| e.command.as_str());
        self.save_suggestion(command, suggestion).map(Some)
    }

    /// Lines for the `settings` meta-command.
    pub fn settings_summary(&self) -> Vec<String> {
        vec![
            format!("AI Model: {}", self.settings.model),
            format!(
                "API Key Configured: {}",
                if self.settings.ai_enabled() { "Yes" } else { "No" }
            ),
            format!("Knowledge Base Location: {}", self.store.root().display()),
            format!("Interaction Log: {}", self.settings.interactions_path().display()),
            format!("AI Response Cooldown: {} seconds", self.cooldown.interval().as_secs_f64()),
            format!("History Sent To AI: last {} commands", self.settings.history_window),
        ]
    }
}
