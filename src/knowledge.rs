use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CATEGORY: &str = "general";
pub const SUGGESTION_CATEGORY: &str = "ai_suggestions";

const SNIPPET_CHARS: usize = 200;
const INTERACTIONS_FILENAME: &str = "ai_results_history.json";

/// A knowledge file whose content matched at least one search term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub category: String,
    pub filename: String,
    pub snippet: String,
}

/// One logged exchange with the remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub command: String,
    pub response: String,
    pub timestamp: String,
}

/// Category directories of text snippets plus the interaction log.
///
/// The interaction log is rewritten in full on every append, so concurrent
/// writers (two sessions sharing a root) can lose records.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    root: PathBuf,
}

impl KnowledgeStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn interactions_path(&self) -> PathBuf {
        self.root.join(INTERACTIONS_FILENAME)
    }

    /// Creates the root, the `general` category, and an empty interaction log if missing.
    pub fn ensure(&self) -> Result<()> {
        let general = self.root.join(DEFAULT_CATEGORY);
        fs::create_dir_all(&general).with_context(|| {
            format!("Failed to create knowledge base directory at {}", general.display())
        })?;
        let interactions = self.interactions_path();
        if !interactions.exists() {
            fs::write(&interactions, "[]").with_context(|| {
                format!("Failed to create interaction log at {}", interactions.display())
            })?;
        }
        log::info!("Knowledge Base directory ensured at {}", self.root.display());
        Ok(())
    }

    /// Writes `content` to `<root>/<category>/<filename>`, replacing any existing file.
    pub fn save(&self, filename: &str, content: &str, category: &str) -> Result<PathBuf> {
        let category_path = self.root.join(category);
        fs::create_dir_all(&category_path).with_context(|| {
            format!("Failed to create category directory at {}", category_path.display())
        })?;
        let file_path = category_path.join(filename);
        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write KB file {}", file_path.display()))?;
        log::info!("Saved '{}' to KB under '{}'", filename, category);
        Ok(file_path)
    }

    /// Case-insensitive substring search over the files directly under `category`.
    /// Unreadable files are logged and skipped.
    pub fn search<S: AsRef<str>>(&self, terms: &[S], category: &str) -> Vec<SearchHit> {
        let category_path = self.root.join(category);
        let entries = match fs::read_dir(&category_path) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let needles: Vec<String> = terms.iter().map(|t| t.as_ref().to_lowercase()).collect();
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut hits = Vec::new();
        for path in files {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    log::error!("Error reading KB file {}: {}", filename, e);
                    continue;
                }
            };
            let haystack = content.to_lowercase();
            if needles.iter().any(|needle| haystack.contains(needle.as_str())) {
                hits.push(SearchHit {
                    category: category.to_string(),
                    filename,
                    snippet: excerpt(&content),
                });
            }
        }
        hits
    }

    /// Category directory names under the root, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect(),
            Err(e) => {
                log::error!("Error listing KB categories in {}: {}", self.root.display(), e);
                Vec::new()
            }
        };
        categories.sort();
        categories
    }

    /// Runs [`search`](Self::search) over every category.
    pub fn search_all<S: AsRef<str>>(&self, terms: &[S]) -> Vec<SearchHit> {
        self.categories()
            .iter()
            .flat_map(|category| self.search(terms, category))
            .collect()
    }

    /// Reads the interaction log; a missing or malformed file reads as empty.
    pub fn load_interactions(&self) -> Vec<InteractionRecord> {
        let path = self.interactions_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Interaction log {} is malformed, starting fresh: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Read-modify-write append of one record. Not atomic.
    pub fn append_interaction(&self, command: &str, response: &str) -> Result<()> {
        let mut records = self.load_interactions();
        records.push(InteractionRecord {
            command: command.to_string(),
            response: response.to_string(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        let path = self.interactions_path();
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize interaction log")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write interaction log at {}", path.display()))
    }
}

fn excerpt(content: &str) -> String {
    let mut snippet: String = content.chars().take(SNIPPET_CHARS).collect();
    snippet.push_str("...");
    snippet
}
