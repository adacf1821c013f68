// main.rs
// Entry point for the AI Linux Co-Pilot shell wrapper

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use console::Style;

mod assistant;
mod commands;
mod config;
mod knowledge;
mod logging;
mod parser;
mod repl;
mod session;
mod styling;
mod terminal_ui;
mod ui;

use assistant::GeminiClient;
use config::Settings;
use repl::Console;
use session::CopilotSession;

const APP_NAME: &str = "AI Linux Co-Pilot";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    println!();
    print_banner();

    let console = match init_copilot() {
        Ok(Some(console)) => console,
        Ok(None) => return Ok(()),
        Err(e) => {
            let error_style = Style::new().red();
            eprintln!(
                "{} {}",
                error_style.apply_to("[ERROR]"),
                error_style.apply_to(format!("Initialization error: {:#}", e))
            );
            process::exit(1);
        }
    };

    if let Err(e) = console.run().await {
        log::error!("Critical: {:#}", e);
        let error_style = Style::new().red();
        eprintln!(
            "{} {}",
            error_style.apply_to("[ERROR]"),
            error_style.apply_to(format!("Runtime error: {:#}", e))
        );
        process::exit(1);
    }
    Ok(())
}

fn print_banner() {
    let header_style = Style::new().blue().bright().bold();
    let separator_style = Style::new().black().bright();
    let info_style = Style::new().black();
    let bar_char = "━";

    println!("{}", header_style.apply_to(bar_char.repeat(ui::WIDTH)));
    println!(
        "  {} {} {} {}",
        header_style.apply_to(APP_NAME),
        info_style.apply_to(format!("v{}", VERSION)),
        separator_style.apply_to("│"),
        info_style.apply_to("Your AI shell companion")
    );
    println!("{}\n", header_style.apply_to(bar_char.repeat(ui::WIDTH)));
}

fn print_settings(settings: &Settings) {
    let arrow_style = Style::new().black();
    let label_style = Style::new().bold();
    let value_style = Style::new().cyan();

    for (label, value) in [
        ("Using model:", settings.model.clone()),
        ("Knowledge base:", settings.kb_root.display().to_string()),
        ("Session log:", settings.session_log_path().display().to_string()),
    ] {
        println!(
            "  {} {:<18} {}",
            arrow_style.apply_to("»"),
            label_style.apply_to(label),
            value_style.apply_to(value)
        );
    }
    println!("{}\n", Style::new().black().bright().apply_to("━".repeat(ui::WIDTH)));
}

/// Asks a yes/no question on stdin; anything but `y` is a no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Loads settings, installs logging, and builds the session.
/// Returns `None` when the user declines to run without a key.
fn init_copilot() -> Result<Option<Console<GeminiClient>>> {
    let settings = config::load_settings()?;

    fs::create_dir_all(&settings.kb_root).with_context(|| {
        format!("Failed to create knowledge base at {}", settings.kb_root.display())
    })?;
    logging::SessionLogger::new(&settings.session_log_path(), settings.log_level)?.install()?;
    log::info!("Loaded settings (model: {})", settings.model);

    print_settings(&settings);

    let client = match settings.api_key.as_deref() {
        Some(key) => Some(GeminiClient::new(key, &settings.model, &settings.api_base)?),
        None => {
            log::error!("{} not found. AI assistance disabled.", config::API_KEY_VAR);
            println!(
                "{}",
                ui::warn_tag(&format!(
                    "{} is not set. Put it in your environment or a .env file to enable AI assistance.",
                    config::API_KEY_VAR
                ))
            );
            if !confirm("Continue without AI assistance? (y/n)")? {
                log::info!("User declined to continue without AI assistance");
                return Ok(None);
            }
            None
        }
    };

    let cwd = env::current_dir().context("Failed to read current directory")?;
    let session = CopilotSession::new(settings, client, cwd)?;
    repl::print_welcome();
    Console::new(session).map(Some)
}
