//! Claude Code data source
//!
//! Parses JSONL logs from ~/.claude/projects/ (or $CLAUDE_CONFIG_DIR/projects).

mod config;
mod parser;

pub(crate) use config::ClaudeSource;
