//! Codex CLI adapter

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::SourceError;
use crate::source::{ParsedFile, SourceAdapter, discover_jsonl};

use super::parser::parse_codex_log;

const DEFAULT_CODEX_DIR: &str = ".codex";
const SESSION_SUBDIR: &str = "sessions";

/// Codex data source
#[derive(Debug, Clone)]
pub(crate) struct CodexSource {
    sessions_dir: Option<PathBuf>,
}

impl CodexSource {
    /// `home` replaces `~/.codex` when set
    pub(crate) fn new(home: Option<PathBuf>) -> Self {
        let sessions_dir = home
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_CODEX_DIR)))
            .map(|h| h.join(SESSION_SUBDIR));
        Self { sessions_dir }
    }
}

#[async_trait]
impl SourceAdapter for CodexSource {
    fn id(&self) -> &str {
        "codex"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["cx"]
    }

    async fn discover(&self) -> Result<Vec<PathBuf>, SourceError> {
        match &self.sessions_dir {
            Some(dir) => discover_jsonl(dir),
            None => Ok(Vec::new()),
        }
    }

    async fn parse_file(&self, path: &Path) -> Result<ParsedFile, SourceError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::io(path, e))?;
        let session_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(crate::consts::UNKNOWN);
        Ok(parse_codex_log(&content, session_id))
    }
}
