use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

const KB_DIR_NAME: &str = ".ai_linux_copilot_kb";
const CONFIG_FILENAME: &str = "config.toml";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_COOLDOWN_SECS: u64 = 2;
pub const DEFAULT_HISTORY_WINDOW: usize = 3;
pub const DEFAULT_KB_EXCERPTS: usize = 2;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const MODEL_VAR: &str = "GOOGLE_AI_MODEL";
pub const API_BASE_VAR: &str = "GOOGLE_AI_BASE_URL";
pub const LOG_LEVEL_VAR: &str = "COPILOT_LOG";
pub const KB_DIR_VAR: &str = "COPILOT_KB_DIR";

/// Optional overrides read from `<kb root>/config.toml`.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
    #[serde(default)]
    pub history_window: Option<usize>,
    #[serde(default)]
    pub kb_excerpts: Option<usize>,
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Effective runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub kb_root: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub cooldown: Duration,
    pub history_window: usize,
    pub kb_excerpts: usize,
    pub log_level: log::LevelFilter,
}

impl Settings {
    /// Defaults rooted at `kb_root`, with no credential.
    pub fn with_root(kb_root: PathBuf) -> Self {
        Self {
            kb_root,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
            history_window: DEFAULT_HISTORY_WINDOW,
            kb_excerpts: DEFAULT_KB_EXCERPTS,
            log_level: log::LevelFilter::Info,
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn session_log_path(&self) -> PathBuf {
        self.kb_root.join("copilot_session.log")
    }

    pub fn interactions_path(&self) -> PathBuf {
        self.kb_root.join("ai_results_history.json")
    }

    /// Layers the file config and then the environment over the defaults.
    /// Empty environment values count as unset.
    pub fn resolve(
        kb_root: PathBuf,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::with_root(kb_root);

        if let Some(model) = file.model {
            settings.model = model;
        }
        if let Some(base) = file.api_base {
            settings.api_base = base;
        }
        if let Some(secs) = file.cooldown_secs {
            settings.cooldown = Duration::from_secs(secs);
        }
        if let Some(window) = file.history_window {
            settings.history_window = window;
        }
        if let Some(excerpts) = file.kb_excerpts {
            settings.kb_excerpts = excerpts;
        }
        if let Some(level) = file.log_level {
            settings.log_level = parse_level(&level)?;
        }

        settings.api_key = env(API_KEY_VAR);
        if let Some(model) = env(MODEL_VAR) {
            settings.model = model;
        }
        if let Some(base) = env(API_BASE_VAR) {
            settings.api_base = base;
        }
        if let Some(level) = env(LOG_LEVEL_VAR) {
            settings.log_level = parse_level(&level)?;
        }
        Ok(settings)
    }
}

fn parse_level(value: &str) -> Result<log::LevelFilter> {
    value
        .parse::<log::LevelFilter>()
        .map_err(|_| anyhow!("Invalid log level '{}'", value))
}

/// Returns the knowledge-base root, honouring `COPILOT_KB_DIR`.
pub fn kb_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(KB_DIR_VAR).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))
        .map(|home| home.join(KB_DIR_NAME))
}

/// Reads `config.toml` under `kb_root`; a missing file yields the defaults.
pub fn load_file_config(kb_root: &Path) -> Result<FileConfig> {
    let config_path = kb_root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(FileConfig::default());
    }
    let toml_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file from {}", config_path.display()))?;
    toml::from_str(&toml_content)
        .with_context(|| format!("Failed to parse config file at {}", config_path.display()))
}

/// Loads dotenv files, then resolves settings from disk and the process environment.
pub fn load_settings() -> Result<Settings> {
    dotenvy::dotenv().ok();
    let root = kb_root()?;
    dotenvy::from_path(root.join(".env")).ok();

    let file = load_file_config(&root)?;
    Settings::resolve(root, file, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let settings =
            Settings::resolve(PathBuf::from("/kb"), FileConfig::default(), env_from(&[])).unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.cooldown, Duration::from_secs(2));
        assert_eq!(settings.history_window, 3);
        assert_eq!(settings.kb_excerpts, 2);
        assert!(!settings.ai_enabled());
        assert_eq!(settings.interactions_path(), PathBuf::from("/kb/ai_results_history.json"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig {
            model: Some("file-model".to_string()),
            cooldown_secs: Some(5),
            ..FileConfig::default()
        };
        let env = env_from(&[(API_KEY_VAR, "secret"), (MODEL_VAR, "env-model")]);
        let settings = Settings::resolve(PathBuf::from("/kb"), file, env).unwrap();
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.cooldown, Duration::from_secs(5));
        assert_eq!(settings.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let env = env_from(&[(API_KEY_VAR, "   ")]);
        let settings = Settings::resolve(PathBuf::from("/kb"), FileConfig::default(), env).unwrap();
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let env = env_from(&[(LOG_LEVEL_VAR, "loud")]);
        assert!(Settings::resolve(PathBuf::from("/kb"), FileConfig::default(), env).is_err());
    }

    #[test]
    fn test_load_file_config_missing_and_present() {
        let dir = tempdir().unwrap();
        assert_eq!(load_file_config(dir.path()).unwrap(), FileConfig::default());

        fs::write(
            dir.path().join(CONFIG_FILENAME),
            "model = \"gemini-pro\"\nkb_excerpts = 4\nlog_level = \"debug\"\n",
        )
        .unwrap();
        let file = load_file_config(dir.path()).unwrap();
        assert_eq!(file.model.as_deref(), Some("gemini-pro"));
        assert_eq!(file.kb_excerpts, Some(4));
        assert_eq!(file.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_malformed_file_config_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "model = [").unwrap();
        assert!(load_file_config(dir.path()).is_err());
    }
}
