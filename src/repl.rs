use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use crate::assistant::ModelClient;
use crate::parser::{self, Input};
use crate::session::CopilotSession;
use crate::styling::STYLER;
use crate::terminal_ui::CopilotHelper;
use crate::ui;

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Requested,
    EndOfInput,
    Interrupted,
}

enum Flow {
    Continue,
    Stop(Shutdown),
}

/// Prompt text for `cwd`: its last component, then `$`, or `#` for root.
pub fn prompt_for(cwd: &Path, privileged: bool) -> String {
    let name = cwd
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| cwd.display().to_string());
    format!("{}{} ", name, if privileged { "#" } else { "$" })
}

#[cfg(unix)]
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}

/// Runs `fut` unless Ctrl-C arrives first.
async fn interruptible<F: Future>(fut: F) -> Option<F::Output> {
    tokio::select! {
        output = fut => Some(output),
        _ = tokio::signal::ctrl_c() => None,
    }
}

pub fn print_welcome() {
    println!(
        "{}",
        STYLER.banner_style("Welcome to AI Linux Co-Pilot! Type 'exit' or 'quit' to leave.")
    );
    println!("{}", STYLER.info_style(meta_command_lines(false)));
}

fn meta_command_lines(full: bool) -> String {
    let mut lines = vec![
        ("ai? <question>", "Ask AI about previous command or general Linux question"),
        ("history", "Show recent command history"),
        ("kb <search term>", "Search knowledge base"),
        ("settings", "Show current settings"),
    ];
    if full {
        lines.extend([
            ("undo", "Undo last command (removes it from history)"),
            ("clear", "Clear screen"),
            ("exit, quit", "Exit the co-pilot"),
        ]);
    } else {
        lines.insert(1, ("help", "Show available commands"));
    }
    lines
        .iter()
        .map(|(cmd, desc)| format!("  {:<20} {}", STYLER.command_style(cmd), desc))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The interactive read-dispatch loop.
pub struct Console<M> {
    session: CopilotSession<M>,
    editor: Editor<CopilotHelper, DefaultHistory>,
    privileged: bool,
}

impl<M: ModelClient> Console<M> {
    pub fn new(session: CopilotSession<M>) -> Result<Self> {
        let privileged = is_privileged();
        let mut editor = Editor::<CopilotHelper, DefaultHistory>::new()
            .context("Failed to initialize rustyline editor")?;
        editor.set_helper(Some(CopilotHelper::new(privileged)));
        Ok(Self {
            session,
            editor,
            privileged,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        log::info!("AI Linux Co-Pilot session started");
        let reason = loop {
            let prompt = prompt_for(self.session.cwd(), self.privileged);
            let line = match self.editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => break Shutdown::Interrupted,
                Err(ReadlineError::Eof) => break Shutdown::EndOfInput,
                Err(err) => {
                    log::error!("Critical: input error: {}", err);
                    eprintln!("{}", STYLER.error_style(format!("Input error: {}", err)));
                    break Shutdown::EndOfInput;
                }
            };
            let _ = self.editor.add_history_entry(line.as_str());

            match self.dispatch(parser::parse_input(&line)).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop(reason)) => break reason,
                Err(e) => {
                    log::error!("Critical: error in main loop: {:#}", e);
                    eprintln!("{}", ui::err_tag(&format!("Error in main loop: {:#}", e)));
                }
            }
        };

        if reason != Shutdown::Requested {
            println!("\nExiting Co-Pilot...");
        }
        log::info!("AI Linux Co-Pilot session ended ({:?})", reason);
        Ok(())
    }

    async fn dispatch(&mut self, input: Input) -> Result<Flow> {
        match input {
            Input::Empty => {}
            Input::Exit => return Ok(Flow::Stop(Shutdown::Requested)),
            Input::Help => {
                println!("{}", ui::panel("Available commands", &meta_command_lines(true)));
            }
            Input::History => self.show_history(),
            Input::KbSearch(term) => self.show_kb_results(&term),
            Input::Settings => {
                let body = self
                    .session
                    .settings_summary()
                    .iter()
                    .map(|line| ui::bullet_line(line))
                    .collect::<Vec<_>>()
                    .join("\n");
                println!("{}", ui::panel("Current Settings", &body));
            }
            Input::Undo => match self.session.undo() {
                Some(entry) => println!("{}", STYLER.info_style(format!("Undid command: {}", entry.command))),
                None => println!("{}", STYLER.warning_style("No commands to undo.")),
            },
            Input::Clear => {
                ::console::Term::stdout()
                    .clear_screen()
                    .context("Failed to clear the screen")?;
            }
            Input::Ask(question) => {
                if self.session.history().is_empty() {
                    println!(
                        "{}",
                        STYLER.warning_style(
                            "No previous command to ask about. Ask a general Linux question or run a command first."
                        )
                    );
                }
                let question = Some(question.as_str()).filter(|q| !q.is_empty());
                return self.assist(question).await;
            }
            Input::Shell(line) => return self.execute(&line).await,
        }
        Ok(Flow::Continue)
    }

    async fn execute(&mut self, line: &str) -> Result<Flow> {
        println!("{}", STYLER.executing_command_style(self.session.cwd().display(), line));
        let Some(outcome) = interruptible(self.session.run_command(line)).await else {
            return Ok(Flow::Stop(Shutdown::Interrupted));
        };

        if !outcome.stdout.is_empty() {
            println!("{}", STYLER.success_style(format!("Output:\n{}", outcome.stdout.trim())));
        }
        if !outcome.stderr.is_empty() {
            println!("{}", STYLER.error_style(format!("Error Output:\n{}", outcome.stderr.trim())));
        }

        if self.session.should_auto_assist() {
            return self.assist(None).await;
        }
        if self.session.is_throttled() {
            println!("{}", STYLER.warning_style(crate::assistant::COOLDOWN_MESSAGE));
        }
        Ok(Flow::Continue)
    }

    /// Asks the model about the latest command and offers to save any suggestion.
    async fn assist(&mut self, question: Option<&str>) -> Result<Flow> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.magenta.bold} {msg}")
                .context("Invalid spinner template")?
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner.set_message("Co-Pilot is thinking...");

        let reply = interruptible(self.session.assist_last(question)).await;
        spinner.finish_and_clear();
        let Some(reply) = reply else {
            return Ok(Flow::Stop(Shutdown::Interrupted));
        };

        println!("\n{}\n", ui::panel("AI Co-Pilot", &STYLER.assistant_style(&reply).to_string()));

        let parsed = parser::parse_reply(&reply);
        if let Some(query) = &parsed.search_query {
            log::info!("Model asked for a web search, which is not performed: {}", query);
        }
        if let Some(suggestion) = parsed.kb_suggestion {
            self.offer_suggestion(&suggestion)?;
        }
        Ok(Flow::Continue)
    }

    fn offer_suggestion(&mut self, suggestion: &str) -> Result<()> {
        let question = "AI suggests saving this to Knowledge Base. Save? (y/n): ";
        let answer = match self.editor.readline(question) {
            Ok(answer) => answer,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => String::new(),
            Err(err) => return Err(err).context("Failed to read confirmation"),
        };
        match self.session.accept_suggestion(suggestion, &answer) {
            Ok(None) => {}
            Ok(Some(path)) => println!("{}", ui::ok_tag(&format!("Saved to {}", path.display()))),
            Err(e) => {
                log::error!("Failed to save KB suggestion: {:#}", e);
                eprintln!("{}", ui::err_tag(&format!("Could not save suggestion: {:#}", e)));
            }
        }
        Ok(())
    }

    fn show_history(&self) {
        let history = self.session.history();
        if history.is_empty() {
            println!("{}", STYLER.warning_style("No command history yet."));
            return;
        }
        let body = ui::numbered_lines(history.recent(5).iter().map(|e| e.command.as_str()));
        println!("{}", ui::panel("Recent Commands", &STYLER.info_style(body).to_string()));
    }

    fn show_kb_results(&self, term: &str) {
        if term.is_empty() {
            println!("{}", STYLER.warning_style("Please provide a search term for the knowledge base."));
            return;
        }
        let hits = self.session.search_kb(term);
        if hits.is_empty() {
            println!("{}", STYLER.warning_style("No results found in knowledge base."));
            return;
        }
        let body = hits
            .iter()
            .map(|hit| format!(" - {}/{}: {}", hit.category, hit.filename, hit.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        println!("{}", ui::panel("Knowledge Base Results", &STYLER.info_style(body).to_string()));
    }
}
