//! Data source abstraction layer
//!
//! Each CLI tool (Claude, Codex, etc.) implements the [`SourceAdapter`] trait.
//! The scheduler only ever sees this interface and the adapter's id.

pub(crate) mod claude;
pub(crate) mod codex;
pub(crate) mod registry;
pub(crate) mod scheduler;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::UsageEvent;
use crate::error::SourceError;

/// Rows an adapter could not turn into events, with the reasons why.
///
/// Counts are kept as reported; the scheduler normalizes invalid values
/// (NaN, negative) to zero before they reach diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SkippedRows {
    pub(crate) count: f64,
    pub(crate) reasons: Vec<(String, f64)>,
}

impl SkippedRows {
    pub(crate) fn record(&mut self, reason: &str) {
        self.count += 1.0;
        match self.reasons.iter_mut().find(|(r, _)| r == reason) {
            Some((_, n)) => *n += 1.0,
            None => self.reasons.push((reason.to_string(), 1.0)),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0.0 && self.reasons.is_empty()
    }
}

/// Events parsed from one file
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedFile {
    pub(crate) events: Vec<UsageEvent>,
    pub(crate) skipped: Option<SkippedRows>,
}

impl ParsedFile {
    pub(crate) fn new(events: Vec<UsageEvent>, skipped: SkippedRows) -> Self {
        let skipped = (!skipped.is_empty()).then_some(skipped);
        Self { events, skipped }
    }
}

/// Data source trait - implemented by each CLI tool
#[async_trait]
pub(crate) trait SourceAdapter: Send + Sync {
    /// Unique id for this source (used in selection filters and row labels)
    fn id(&self) -> &str;

    /// Short aliases accepted by `--source` (e.g., "cc" for "claude")
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Find all data files for this source
    async fn discover(&self) -> Result<Vec<PathBuf>, SourceError>;

    /// Parse a single file into usage events
    async fn parse_file(&self, path: &Path) -> Result<ParsedFile, SourceError>;
}

/// Shared handle for dynamic dispatch
pub(crate) type SharedSource = Arc<dyn SourceAdapter>;

/// All `*.jsonl` files below `dir`, sorted. A missing directory is not an error.
pub(crate) fn discover_jsonl(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/**/*.jsonl", dir.display());
    let entries = glob::glob(&pattern).map_err(|e| SourceError::Other(e.to_string()))?;
    let mut files: Vec<PathBuf> = entries.flatten().collect();
    files.sort();
    Ok(files)
}

pub(crate) use registry::{SourceOverrides, default_sources, select_sources};
pub(crate) use scheduler::{SourceFailure, SourceReport, ingest};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_rows_group_by_reason() {
        let mut s = SkippedRows::default();
        s.record("invalid json");
        s.record("missing usage");
        s.record("invalid json");
        assert_eq!(s.count, 3.0);
        assert_eq!(
            s.reasons,
            vec![("invalid json".to_string(), 2.0), ("missing usage".to_string(), 1.0)]
        );
    }

    #[test]
    fn parsed_file_drops_empty_skip_report() {
        let parsed = ParsedFile::new(Vec::new(), SkippedRows::default());
        assert!(parsed.skipped.is_none());
    }
}
