//! Data source registry
//!
//! Builds the available adapters and resolves `--source` selections by id or alias.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::claude::ClaudeSource;
use super::codex::CodexSource;
use super::SharedSource;
use crate::core::split_tokens;
use crate::error::AppError;

/// Root directories forced through the environment.
///
/// A source whose root was overridden is treated as explicitly requested.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceOverrides {
    pub(crate) claude_root: Option<PathBuf>,
    pub(crate) codex_home: Option<PathBuf>,
}

impl SourceOverrides {
    pub(crate) fn explicit_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        if self.claude_root.is_some() {
            ids.insert("claude".to_string());
        }
        if self.codex_home.is_some() {
            ids.insert("codex".to_string());
        }
        ids
    }
}

/// All registered data sources
pub(crate) fn default_sources(overrides: &SourceOverrides) -> Vec<SharedSource> {
    vec![
        Arc::new(ClaudeSource::new(overrides.claude_root.clone())),
        Arc::new(CodexSource::new(overrides.codex_home.clone())),
    ]
}

/// Narrow `all` to the sources named in `filter`.
///
/// Without a filter every source is returned and none is explicit. With one,
/// the named sources are returned in registry order and all of them are explicit.
pub(crate) fn select_sources(
    all: Vec<SharedSource>,
    filter: Option<&str>,
) -> Result<(Vec<SharedSource>, HashSet<String>), AppError> {
    let Some(raw) = filter else {
        return Ok((all, HashSet::new()));
    };

    let tokens = split_tokens(raw, "source")?;
    let mut wanted = HashSet::new();
    for token in &tokens {
        let found = all
            .iter()
            .find(|s| s.id() == token || s.aliases().contains(&token.as_str()));
        match found {
            Some(source) => {
                wanted.insert(source.id().to_string());
            }
            None => {
                let available: Vec<&str> = all.iter().map(|s| s.id()).collect();
                return Err(AppError::UnknownSource {
                    input: token.clone(),
                    available: available.join(", "),
                });
            }
        }
    }

    let selected = all
        .into_iter()
        .filter(|s| wanted.contains(s.id()))
        .collect();
    Ok((selected, wanted))
}
