//! OpenAI Codex CLI JSONL parser
//!
//! `token_count` events report running totals for the whole session; each
//! event becomes the delta against the previous total (or `last_token_usage`
//! when the log provides it).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::UsageEvent;
use crate::source::{ParsedFile, SkippedRows};

const PROVIDER: &str = "openai";
/// Older logs never name the model
const FALLBACK_MODEL: &str = "gpt-5";

#[derive(Debug, Deserialize)]
struct LogLine {
    timestamp: Option<String>,
    #[serde(rename = "type")]
    entry_type: Option<String>,
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "type")]
    payload_type: Option<String>,
    info: Option<TokenInfo>,
    model: Option<String>,
    cwd: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    total_token_usage: Option<TokenUsage>,
    last_token_usage: Option<TokenUsage>,
    model: Option<String>,
    model_name: Option<String>,
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    model: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
struct TokenUsage {
    #[serde(default)]
    input_tokens: i64,
    #[serde(default, alias = "cache_read_input_tokens")]
    cached_input_tokens: i64,
    #[serde(default)]
    output_tokens: i64,
    #[serde(default)]
    reasoning_output_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

impl TokenUsage {
    fn subtract(&self, prev: &TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: (self.input_tokens - prev.input_tokens).max(0),
            cached_input_tokens: (self.cached_input_tokens - prev.cached_input_tokens).max(0),
            output_tokens: (self.output_tokens - prev.output_tokens).max(0),
            reasoning_output_tokens: (self.reasoning_output_tokens
                - prev.reasoning_output_tokens)
                .max(0),
            total_tokens: (self.total_tokens - prev.total_tokens).max(0),
        }
    }

    fn is_empty(&self) -> bool {
        self.input_tokens <= 0
            && self.cached_input_tokens <= 0
            && self.output_tokens <= 0
            && self.reasoning_output_tokens <= 0
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn extract_model(payload: &Payload) -> Option<String> {
    let info = payload.info.as_ref();
    non_blank(info.and_then(|i| i.model.as_ref()))
        .or_else(|| non_blank(info.and_then(|i| i.model_name.as_ref())))
        .or_else(|| non_blank(info.and_then(|i| i.metadata.as_ref()).and_then(|m| m.model.as_ref())))
        .or_else(|| non_blank(payload.model.as_ref()))
}

fn unsigned(value: i64) -> u64 {
    value.max(0) as u64
}

pub(super) fn parse_codex_log(content: &str, session_id: &str) -> ParsedFile {
    let mut events = Vec::new();
    let mut skipped = SkippedRows::default();
    let mut previous_totals: Option<TokenUsage> = None;
    let mut current_model: Option<String> = None;
    let mut repo_root: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(row) = serde_json::from_str::<LogLine>(line) else {
            skipped.record("invalid json");
            continue;
        };
        let Some(payload) = &row.payload else {
            continue;
        };

        match row.entry_type.as_deref() {
            Some("turn_context") | Some("session_meta") => {
                if let Some(model) = extract_model(payload) {
                    current_model = Some(model);
                }
                if let Some(cwd) = non_blank(payload.cwd.as_ref()) {
                    repo_root = Some(cwd);
                }
                continue;
            }
            Some("event_msg") if payload.payload_type.as_deref() == Some("token_count") => {}
            _ => continue,
        }

        let Some(info) = &payload.info else {
            skipped.record("missing usage");
            continue;
        };
        let Some(total) = &info.total_token_usage else {
            skipped.record("missing usage");
            continue;
        };

        // Re-emitted totals carry no new usage
        if previous_totals.as_ref() == Some(total) {
            skipped.record("duplicate message");
            continue;
        }

        let delta = match (&info.last_token_usage, &previous_totals) {
            (Some(last), _) => last.clone(),
            (None, Some(prev)) => total.subtract(prev),
            (None, None) => total.clone(),
        };
        previous_totals = Some(total.clone());

        let Some(raw_ts) = row.timestamp.as_deref() else {
            skipped.record("missing timestamp");
            continue;
        };
        let Ok(timestamp) = raw_ts.parse::<DateTime<Utc>>() else {
            skipped.record("invalid timestamp");
            continue;
        };

        if delta.is_empty() {
            continue;
        }

        if let Some(model) = extract_model(payload) {
            current_model = Some(model);
        }
        let model = current_model.as_deref().unwrap_or(FALLBACK_MODEL);

        // input_tokens includes the cached portion
        let cached = unsigned(delta.cached_input_tokens);
        let mut event = UsageEvent::new("codex", session_id, timestamp)
            .with_provider(PROVIDER)
            .with_model(model);
        event.repo_root = repo_root.clone();
        event.input_tokens = unsigned(delta.input_tokens).saturating_sub(cached);
        event.cache_read_tokens = cached;
        event.output_tokens = unsigned(delta.output_tokens);
        event.reasoning_tokens = unsigned(delta.reasoning_output_tokens);
        event.total_tokens = unsigned(delta.total_tokens);
        events.push(event);
    }

    ParsedFile::new(events, skipped)
}
