//! ui.rs — helpers for the co-pilot's sectioned terminal output.
//! Uses crossterm styling; renders compact, readable sections.

use crossterm::style::Stylize;

/// Default content width for separators/panels.
pub const WIDTH: usize = 70;

/// Thin horizontal rule.
pub fn hr() -> String {
    "─".repeat(WIDTH).dark_grey().to_string()
}

/// A section title:  █ Title
pub fn title_line(title: &str) -> String {
    format!("█ {}", title.bold().white())
}

/// Bullet line: "  • text"
pub fn bullet_line(text: &str) -> String {
    format!("  • {}", text)
}

pub fn ok_tag(text: &str) -> String {
    format!("[OK] {}", text).green().to_string()
}
pub fn warn_tag(text: &str) -> String {
    format!("[WARN] {}", text).yellow().to_string()
}
pub fn err_tag(text: &str) -> String {
    format!("[ERR] {}", text).red().to_string()
}

/// Simple, clean panel with a title and body.
/// Layout:
/// ─────────────────────────────────────────────
/// █ TITLE
/// <body>
/// ─────────────────────────────────────────────
pub fn panel(title: &str, body: &str) -> String {
    let mut out = String::new();
    out.push_str(&hr());
    out.push('\n');
    out.push_str(&title_line(title));
    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(body);
    }
    out.push('\n');
    out.push_str(&hr());
    out
}

/// Numbered listing of the last commands, numbered from 1.
pub fn numbered_lines<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| format!(" {}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_contains_title_and_body() {
        let out = panel("AI Co-Pilot", "explanation");
        assert!(out.contains("AI Co-Pilot"));
        assert!(out.contains("\nexplanation\n"));
    }

    #[test]
    fn test_panel_skips_blank_body() {
        let out = panel("Empty", "   ");
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_numbered_lines() {
        assert_eq!(numbered_lines(["ls", "pwd"]), " 1. ls\n 2. pwd");
    }
}
