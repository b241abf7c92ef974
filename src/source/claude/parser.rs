//! Claude Code JSONL parser

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::core::UsageEvent;
use crate::source::{ParsedFile, SkippedRows};

const PROVIDER: &str = "anthropic";
const SYNTHETIC_MODEL: &str = "<synthetic>";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogLine {
    #[serde(rename = "type")]
    line_type: Option<String>,
    timestamp: Option<String>,
    session_id: Option<String>,
    cwd: Option<String>,
    request_id: Option<String>,
    #[serde(rename = "costUSD")]
    cost_usd: Option<f64>,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: Option<String>,
    model: Option<String>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    input_tokens: Option<i64>,
    output_tokens: Option<i64>,
    cache_creation_input_tokens: Option<i64>,
    cache_read_input_tokens: Option<i64>,
}

fn count(value: Option<i64>) -> u64 {
    value.unwrap_or(0).max(0) as u64
}

/// One kept row of a streamed message
#[derive(Debug)]
struct Candidate {
    key: Option<String>,
    completed: bool,
    event: UsageEvent,
}

impl Candidate {
    /// A completed row beats a partial one; otherwise the later row wins.
    fn is_replaced_by(&self, other: &Candidate) -> bool {
        match (self.completed, other.completed) {
            (false, true) => true,
            (true, false) => false,
            _ => other.event.timestamp >= self.event.timestamp,
        }
    }
}

/// Rows of one Claude session log, deduplicated within the file
#[derive(Debug, Default)]
pub(super) struct ClaudeLog {
    candidates: Vec<Candidate>,
    skipped: SkippedRows,
}

impl ClaudeLog {
    /// Drop messages already claimed by another file and finish the parse.
    pub(super) fn into_parsed(mut self, seen: &mut HashSet<String>) -> ParsedFile {
        let mut events = Vec::with_capacity(self.candidates.len());
        for candidate in self.candidates {
            if let Some(key) = candidate.key
                && !seen.insert(key)
            {
                self.skipped.record("duplicate message");
                continue;
            }
            events.push(candidate.event);
        }
        ParsedFile::new(events, self.skipped)
    }
}

/// Convert one Claude session log into events.
///
/// Only assistant rows carry usage; other row types are ignored outright.
/// Streaming writes several rows per message and request id; the completed
/// row (with `stop_reason`) is kept, else the latest one.
pub(super) fn parse_claude_log(content: &str, file_session: &str) -> ClaudeLog {
    let mut log = ClaudeLog::default();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(row) = serde_json::from_str::<LogLine>(line) else {
            log.skipped.record("invalid json");
            continue;
        };

        let usage = row.message.as_ref().and_then(|m| m.usage.as_ref());
        let Some(usage) = usage else {
            if row.line_type.as_deref() == Some("assistant") {
                log.skipped.record("missing usage");
            }
            continue;
        };

        let Some(raw_ts) = row.timestamp.as_deref() else {
            log.skipped.record("missing timestamp");
            continue;
        };
        let Ok(timestamp) = raw_ts.parse::<DateTime<Utc>>() else {
            log.skipped.record("invalid timestamp");
            continue;
        };

        let message = row.message.as_ref();
        let model = message
            .and_then(|m| m.model.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty());
        if model == Some(SYNTHETIC_MODEL) {
            continue;
        }

        let session = row.session_id.as_deref().unwrap_or(file_session);
        let mut event = UsageEvent::new("claude", session, timestamp).with_provider(PROVIDER);
        if let Some(model) = model {
            event = event.with_model(model);
        }
        event.repo_root = row.cwd.clone();
        event.input_tokens = count(usage.input_tokens);
        event.output_tokens = count(usage.output_tokens);
        event.cache_write_tokens = count(usage.cache_creation_input_tokens);
        event.cache_read_tokens = count(usage.cache_read_input_tokens);
        event.total_tokens = event.input_tokens
            + event.output_tokens
            + event.cache_write_tokens
            + event.cache_read_tokens;

        if let Some(cost) = row.cost_usd.filter(|c| c.is_finite()) {
            event = event.with_explicit_cost(cost);
        }

        let candidate = Candidate {
            key: message
                .and_then(|m| m.id.as_deref())
                .map(|id| format!("{id}:{}", row.request_id.as_deref().unwrap_or(""))),
            completed: message.is_some_and(|m| m.stop_reason.is_some()),
            event,
        };

        match candidate.key.as_ref().and_then(|k| by_key.get(k)) {
            Some(&idx) => {
                log.skipped.record("duplicate message");
                if log.candidates[idx].is_replaced_by(&candidate) {
                    log.candidates[idx] = candidate;
                }
            }
            None => {
                if let Some(key) = &candidate.key {
                    by_key.insert(key.clone(), log.candidates.len());
                }
                log.candidates.push(candidate);
            }
        }
    }

    log
}
