//! OpenAI Codex CLI data source
//!
//! Parses JSONL logs from ~/.codex/sessions/ (or $CODEX_HOME/sessions).
//! Codex logs carry cumulative token counts that need delta computation.

mod config;
mod parser;

pub(crate) use config::CodexSource;
