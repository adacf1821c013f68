use crossterm::style::{Color, Stylize};
use once_cell::sync::Lazy;

pub static STYLER: Lazy<Styler> = Lazy::new(Styler::new);

/// Colour roles used across the console output.
pub struct Styler {
    success: Color,
    error: Color,
    warning: Color,
    info: Color,
    dim_gray: Color,
    command: Color,
    assistant: Color,
    prompt: Color,
    privileged_prompt: Color,
    banner: Color,
}

impl Styler {
    fn new() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Cyan,
            dim_gray: Color::DarkGrey,
            command: Color::Yellow,
            assistant: Color::Cyan,
            prompt: Color::Blue,
            privileged_prompt: Color::Red,
            banner: Color::Magenta,
        }
    }

    /// Base style function that applies a color to text.
    pub fn style_text<D: std::fmt::Display>(&self, text: D, color: Color) -> impl std::fmt::Display {
        text.to_string().with(color)
    }

    /// Command stdout and confirmations (green).
    pub fn success_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        self.style_text(text, self.success)
    }

    /// Command stderr and failures (red).
    pub fn error_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        self.style_text(text, self.error)
    }

    /// Notices such as the cooldown message or an empty history (yellow).
    pub fn warning_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        self.style_text(text, self.warning)
    }

    /// Listings: help, settings, history, kb results (cyan).
    pub fn info_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        self.style_text(text, self.info)
    }

    /// Style text in dim gray. Returns a formatted string with:
    /// - text in dark grey color with dim effect
    /// output:
    /// [dark grey]text[reset]
    pub fn dim_gray_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        text.to_string().with(self.dim_gray).dim()
    }

    /// Style text for an executing command. Returns a formatted string with:
    /// - "executing" in bold yellow
    /// - command and working directory in dim gray
    /// output:
    /// [yellow bold]executing[reset] [dim gray]ls -la
    /// /home/user/projects[reset]
    pub fn executing_command_style(
        &self,
        cwd: impl std::fmt::Display,
        command: impl std::fmt::Display,
    ) -> impl std::fmt::Display {
        let executing = String::from("executing").with(self.command).bold();
        format!(
            "{} {}\n{}",
            executing,
            self.dim_gray_style(command),
            self.dim_gray_style(cwd),
        )
    }

    /// Model replies (cyan).
    pub fn assistant_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        self.style_text(text, self.assistant)
    }

    /// The input prompt: blue normally, red when running as root.
    pub fn prompt_style<D: std::fmt::Display>(&self, text: D, privileged: bool) -> impl std::fmt::Display {
        let color = if privileged { self.privileged_prompt } else { self.prompt };
        self.style_text(text, color)
    }

    pub fn banner_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        text.to_string().with(self.banner).bold()
    }

    /// Meta-command names in help and hints.
    pub fn command_style<D: std::fmt::Display>(&self, text: D) -> impl std::fmt::Display {
        text.to_string().with(self.success).bold()
    }
}
