//! Claude Code adapter
//!
//! Defines the ClaudeSource implementation of the SourceAdapter trait.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SourceError;
use crate::source::{ParsedFile, SourceAdapter, discover_jsonl};

use super::parser::parse_claude_log;

/// Claude data source
#[derive(Debug)]
pub(crate) struct ClaudeSource {
    projects_dir: Option<PathBuf>,
    /// Message keys already emitted by any file of this run
    seen: Mutex<HashSet<String>>,
}

impl ClaudeSource {
    /// `root` replaces `~/.claude` when set
    pub(crate) fn new(root: Option<PathBuf>) -> Self {
        let projects_dir = root
            .or_else(|| dirs::home_dir().map(|h| h.join(".claude")))
            .map(|r| r.join("projects"));
        Self {
            projects_dir,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl SourceAdapter for ClaudeSource {
    fn id(&self) -> &str {
        "claude"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["cc"]
    }

    async fn discover(&self) -> Result<Vec<PathBuf>, SourceError> {
        match &self.projects_dir {
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
        let log = parse_claude_log(&content, session_id);
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| SourceError::Other("message dedup state poisoned".to_string()))?;
        Ok(log.into_parsed(&mut seen))
    }
}
