//! JSON chat log: one file per interaction plus a running session file.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session_history.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct ChatLog {
    dir: PathBuf,
}

impl ChatLog {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating chat log directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Write `log_<YYYY-MM-DD_HH-MM-SS>.json` and append to the session file.
    /// Returns the path of the per-interaction file.
    pub fn save(&self, question: &str, answer: &str) -> Result<PathBuf> {
        let now = Local::now();
        let entry = ChatEntry {
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        };
        let stem = format!("log_{}", now.format("%Y-%m-%d_%H-%M-%S"));
        let path = self.unused_path(&stem);
        std::fs::write(&path, serde_json::to_string_pretty(&entry)?)
            .with_context(|| format!("writing {}", path.display()))?;

        if let Err(e) = self.append_session(&entry) {
            tracing::warn!(error = %e, "could not update session history");
        }
        Ok(path)
    }

    // same-second saves get a numeric suffix, which still sorts after the bare name
    fn unused_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}_{n}.json"));
            n += 1;
        }
        path
    }

    fn append_session(&self, entry: &ChatEntry) -> Result<()> {
        let mut history = self.session()?;
        history.push(entry.clone());
        std::fs::write(self.session_path(), serde_json::to_string_pretty(&history)?)?;
        Ok(())
    }

    /// Every interaction recorded in the session file, oldest first.
    pub fn session(&self) -> Result<Vec<ChatEntry>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Per-interaction log files, newest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("log_") && n.ends_with(".json"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort_by(|a, b| b.cmp(a));
        Ok(files)
    }

    /// Load one log file. A bare file name is looked up in the log directory.
    pub fn load(&self, path: &Path) -> Result<ChatEntry> {
        let path = if path.is_absolute() || path.exists() { path.to_path_buf() } else { self.dir.join(path) };
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Remove every `.json` file in the directory. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|x| x == "json").unwrap_or(false) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
