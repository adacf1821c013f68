mod gemini;
mod prompt;

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::commands::HistoryEntry;
use crate::knowledge::KnowledgeStore;

pub use gemini::{GeminiClient, ModelClient};
pub use prompt::{PromptBuilder, PromptInput};

pub const COOLDOWN_MESSAGE: &str = "AI on cooldown. Wait a moment before requesting help again.";
pub const MISSING_KEY_MESSAGE: &str = "AI Error: API Key not configured.";

/// Minimum spacing between model calls.
///
/// Owned by the session and handed to [`Assistant::assist`] on every call.
#[derive(Debug, Clone)]
pub struct Cooldown {
    interval: Duration,
    last_call: Option<Instant>,
    throttled: bool,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
            throttled: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Admits a call at `now` unless it falls inside the window of the last
    /// one; a rejection marks the state throttled.
    fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_call {
            if now.saturating_duration_since(last) < self.interval {
                self.throttled = true;
                return false;
            }
        }
        true
    }

    fn record(&mut self, at: Instant) {
        self.last_call = Some(at);
        self.throttled = false;
    }

    /// True after a rejected call, until the next completed call or until the
    /// window has passed.
    pub fn is_throttled(&self) -> bool {
        self.throttled
            && self
                .last_call
                .is_some_and(|last| last.elapsed() < self.interval)
    }
}

/// What to ask the model about.
pub struct AssistRequest<'a> {
    /// Commands before the current one, oldest first.
    pub history: &'a [HistoryEntry],
    pub command: &'a str,
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub question: Option<&'a str>,
}

/// Builds prompts, calls the model, and records replies in the knowledge base.
pub struct Assistant<M> {
    client: Option<M>,
    store: KnowledgeStore,
    prompts: PromptBuilder,
    history_window: usize,
    kb_excerpts: usize,
}

impl<M: ModelClient> Assistant<M> {
    /// `client` is `None` when no API key is configured.
    pub fn new(client: Option<M>, store: KnowledgeStore, history_window: usize, kb_excerpts: usize) -> Result<Self> {
        Ok(Self {
            client,
            store,
            prompts: PromptBuilder::new()?,
            history_window,
            kb_excerpts,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Renders the prompt for `request`, pulling matching knowledge snippets.
    pub fn build_prompt(&self, request: &AssistRequest<'_>) -> Result<String> {
        let start = request.history.len().saturating_sub(self.history_window);
        let terms: Vec<&str> = request
            .command
            .split_whitespace()
            .chain(request.stderr.split_whitespace())
            .collect();
        let mut snippets = self.store.search_all(&terms);
        snippets.truncate(self.kb_excerpts);

        self.prompts.render(&PromptInput {
            history: &request.history[start..],
            command: request.command,
            stdout: request.stdout,
            stderr: request.stderr,
            question: request.question,
            snippets: &snippets,
        })
    }

    /// Asks the model about `request`. Every outcome, including failures, is
    /// returned as display text.
    pub async fn assist(&self, cooldown: &mut Cooldown, request: &AssistRequest<'_>) -> String {
        let now = Instant::now();
        if !cooldown.admit(now) {
            log::info!("AI call rejected: on cooldown");
            return COOLDOWN_MESSAGE.to_string();
        }

        let Some(client) = &self.client else {
            log::error!("GOOGLE_API_KEY not found. AI assistance disabled.");
            return MISSING_KEY_MESSAGE.to_string();
        };

        let prompt = match self.build_prompt(request) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("Error building AI prompt: {:#}", e);
                return format!("AI Configuration Error: {:#}", e);
            }
        };
        log::debug!("Sending prompt to AI (length {}):\n{}", prompt.len(), prompt);

        let result = client.generate(&prompt).await;
        cooldown.record(now);
        match result {
            Ok(reply) => {
                log::debug!("AI Raw Response:\n{}", reply);
                if let Err(e) = self.store.append_interaction(request.command, &reply) {
                    log::error!("Failed to record AI interaction: {:#}", e);
                }
                reply
            }
            Err(e) => {
                log::error!("Error during AI content generation: {:#}", e);
                format!("AI Generation Error: {:#}", e)
            }
        }
    }
}
