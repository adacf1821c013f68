use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub cwd: PathBuf,
    pub stdout: String,
    pub stderr: String,
}

/// Runs command lines through the platform shell, handling `cd` in-process.
pub struct CommandProcessor {
    shell_command: String,
    shell_args: Vec<String>,
    home_dir: Option<PathBuf>,
}

impl CommandProcessor {
    pub fn new() -> Self {
        #[cfg(target_os = "windows")]
        let (shell_command, shell_args) =
            ("powershell".to_string(), vec!["-Command".to_string()]);

        #[cfg(not(target_os = "windows"))]
        let (shell_command, shell_args) = ("sh".to_string(), vec!["-c".to_string()]);

        Self {
            shell_command,
            shell_args,
            home_dir: dirs::home_dir(),
        }
    }

    /// Uses `home` for `~` expansion instead of the real home directory.
    #[cfg(test)]
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home_dir = Some(home);
        self
    }

    /// Executes `line` in `cwd`. A non-zero exit status is not an error; any
    /// failure is reported through `stderr` and the directory is left as is.
    pub async fn execute(&self, line: &str, cwd: &Path) -> CommandOutcome {
        let line = line.trim();
        log::info!("Executing: {} in {}", line, cwd.display());

        if let Some(target) = cd_target(line) {
            return self.change_dir(target, cwd);
        }

        match self.run_shell(line, cwd).await {
            Ok((stdout, stderr)) => CommandOutcome {
                cwd: cwd.to_path_buf(),
                stdout,
                stderr,
            },
            Err(e) => {
                log::error!("Error executing command '{}': {:#}", line, e);
                CommandOutcome {
                    cwd: cwd.to_path_buf(),
                    stdout: String::new(),
                    stderr: format!("{:#}", e),
                }
            }
        }
    }

    /// The child shares the terminal's stdin so prompts like `[Y/n]` can be answered.
    async fn run_shell(&self, line: &str, cwd: &Path) -> Result<(String, String)> {
        let output = Command::new(&self.shell_command)
            .args(&self.shell_args)
            .arg(line)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to execute command: {}", line))?;

        log::debug!(
            "Command '{}' exited with {}",
            line,
            output.status.code().unwrap_or(-1)
        );
        Ok((
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }

    fn change_dir(&self, target: &str, cwd: &Path) -> CommandOutcome {
        let unchanged = |stderr: String| CommandOutcome {
            cwd: cwd.to_path_buf(),
            stdout: String::new(),
            stderr,
        };

        let expanded = match self.expand_home(target) {
            Some(path) => path,
            None => return unchanged("cd: error changing directory: home directory unknown".to_string()),
        };

        // `join` keeps `expanded` as is when it is already absolute.
        match resolve_dir(&cwd.join(&expanded)) {
            Ok(dir) => CommandOutcome {
                cwd: dir,
                stdout: String::new(),
                stderr: String::new(),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                unchanged(format!("cd: no such file or directory: {}", target))
            }
            Err(e) => unchanged(format!("cd: error changing directory: {}", e)),
        }
    }

    /// Expands `~` and `~/...` only; `~user` stays a literal relative path.
    fn expand_home(&self, target: &str) -> Option<PathBuf> {
        if target.is_empty() || target == "~" {
            return self.home_dir.clone();
        }
        match target.strip_prefix("~/") {
            Some(rest) => self.home_dir.as_ref().map(|home| home.join(rest)),
            None => Some(PathBuf::from(target)),
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the argument of a `cd` line (empty for a bare `cd`).
fn cd_target(line: &str) -> Option<&str> {
    if line == "cd" {
        return Some("");
    }
    line.strip_prefix("cd ")
        .or_else(|| line.strip_prefix("cd\t"))
        .map(str::trim)
}

fn resolve_dir(path: &Path) -> io::Result<PathBuf> {
    let resolved = path.canonicalize()?;
    if !resolved.is_dir() {
        return Err(io::Error::new(io::ErrorKind::Other, "not a directory"));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cd_target() {
        assert_eq!(cd_target("cd /tmp"), Some("/tmp"));
        assert_eq!(cd_target("cd   src  "), Some("src"));
        assert_eq!(cd_target("cd"), Some(""));
        assert_eq!(cd_target("cdrecord -v"), None);
        assert_eq!(cd_target("echo cd"), None);
    }

    #[tokio::test]
    async fn test_cd_into_existing_relative_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("child")).unwrap();
        let cwd = dir.path().canonicalize().unwrap();

        let outcome = CommandProcessor::new().execute("cd child", &cwd).await;
        assert_eq!(outcome.cwd, cwd.join("child"));
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_cd_absolute_and_parent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        let root = dir.path().canonicalize().unwrap();
        let processor = CommandProcessor::new();

        let abs = format!("cd {}", root.join("a/b").display());
        let outcome = processor.execute(&abs, Path::new("/")).await;
        assert_eq!(outcome.cwd, root.join("a/b"));

        let outcome = processor.execute("cd ..", &outcome.cwd).await;
        assert_eq!(outcome.cwd, root.join("a"));
    }

    #[tokio::test]
    async fn test_cd_missing_dir_leaves_cwd() {
        let dir = tempdir().unwrap();
        let cwd = dir.path().to_path_buf();

        let outcome = CommandProcessor::new().execute("cd nowhere", &cwd).await;
        assert_eq!(outcome.cwd, cwd);
        assert_eq!(outcome.stderr, "cd: no such file or directory: nowhere");
    }

    #[tokio::test]
    async fn test_cd_into_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("plain.txt"), "x").unwrap();
        let cwd = dir.path().to_path_buf();

        let outcome = CommandProcessor::new().execute("cd plain.txt", &cwd).await;
        assert_eq!(outcome.cwd, cwd);
        assert!(outcome.stderr.starts_with("cd: error changing directory:"));
    }

    #[tokio::test]
    async fn test_cd_home_shorthand() {
        let home = tempdir().unwrap();
        fs::create_dir(home.path().join("projects")).unwrap();
        let home_path = home.path().canonicalize().unwrap();
        let processor = CommandProcessor::new().with_home(home_path.clone());

        let outcome = processor.execute("cd ~/projects", Path::new("/")).await;
        assert_eq!(outcome.cwd, home_path.join("projects"));

        let outcome = processor.execute("cd", Path::new("/")).await;
        assert_eq!(outcome.cwd, home_path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_command_captures_streams() {
        let dir = tempdir().unwrap();
        let cwd = dir.path().canonicalize().unwrap();
        let processor = CommandProcessor::new();

        let outcome = processor.execute("echo hello; echo oops >&2; exit 3", &cwd).await;
        assert_eq!(outcome.stdout, "hello\n");
        assert_eq!(outcome.stderr, "oops\n");
        assert_eq!(outcome.cwd, cwd);

        let outcome = processor.execute("pwd", &cwd).await;
        assert_eq!(outcome.stdout.trim(), cwd.display().to_string());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_shell_command_shares_session_stdin() {
        let Ok(own_stdin) = fs::read_link("/proc/self/fd/0") else {
            return;
        };
        let dir = tempdir().unwrap();
        let cwd = dir.path().canonicalize().unwrap();

        let outcome = CommandProcessor::new().execute("readlink /proc/self/fd/0", &cwd).await;
        assert_eq!(outcome.stdout.trim(), own_stdin.display().to_string());
    }

    #[tokio::test]
    async fn test_cd_tilde_user_is_not_expanded() {
        let home = tempdir().unwrap();
        let work = tempdir().unwrap();
        fs::create_dir(work.path().join("~alice")).unwrap();
        let cwd = work.path().canonicalize().unwrap();
        let processor = CommandProcessor::new().with_home(home.path().to_path_buf());

        let outcome = processor.execute("cd ~alice", &cwd).await;
        assert_eq!(outcome.cwd, cwd.join("~alice"));

        let outcome = processor.execute("cd ~bob", &cwd).await;
        assert_eq!(outcome.stderr, "cd: no such file or directory: ~bob");
    }
}
