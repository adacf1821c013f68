use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::{LevelFilter, Log, Metadata, Record};

/// `log` backend that appends timestamped lines to the session log file.
pub struct SessionLogger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl SessionLogger {
    pub fn new(path: &Path, level: LevelFilter) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open session log at {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
            level,
        })
    }

    /// Installs the logger as the global `log` backend.
    pub fn install(self) -> Result<()> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self)).context("A logger is already installed")?;
        log::set_max_level(level);
        Ok(())
    }

    fn format_entry(record: &Record) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        format!("{} [{}] {}\n", timestamp, record.level(), record.args())
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = Self::format_entry(record);
        // A poisoned lock or failed write must never take the shell down.
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(entry.as_bytes());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_session_logger_writes_levelled_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.log");
        let logger = SessionLogger::new(&path, LevelFilter::Info)?;

        logger.log(
            &Record::builder()
                .args(format_args!("Executing: ls"))
                .level(Level::Info)
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("prompt body"))
                .level(Level::Debug)
                .build(),
        );
        logger.flush();

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("[INFO] Executing: ls"));
        assert!(!content.contains("prompt body"));
        Ok(())
    }

    #[test]
    fn test_session_logger_appends() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.log");
        fs::write(&path, "earlier line\n")?;

        let logger = SessionLogger::new(&path, LevelFilter::Debug)?;
        logger.log(
            &Record::builder()
                .args(format_args!("Error reading KB file"))
                .level(Level::Error)
                .build(),
        );

        let content = fs::read_to_string(&path)?;
        assert!(content.starts_with("earlier line\n"));
        assert!(content.contains("[ERROR] Error reading KB file"));
        Ok(())
    }
}
