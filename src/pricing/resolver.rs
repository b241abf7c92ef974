//! Model name → rate-table key resolution
//!
//! Tiers are tried in a fixed order and the first hit wins: alias table,
//! direct key, provider-prefixed key, version-suffixed key, fuzzy match.
//! An unresolved name comes back normalized so the caller's lookup misses.

use std::collections::HashMap;

use super::aliases;
use super::types::ModelPricing;

type RateTable = HashMap<String, ModelPricing>;

pub(super) fn normalize_model(model: &str) -> String {
    model.trim().to_lowercase()
}

fn strip_provider(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, rest)| rest)
}

pub(super) fn resolve_model(model: &str, table: &RateTable) -> String {
    let normalized = normalize_model(model);
    let candidate = strip_provider(&normalized);

    if let Some(key) = alias_match(&normalized, table).or_else(|| alias_match(candidate, table)) {
        return key;
    }
    if table.contains_key(&normalized) {
        return normalized;
    }
    if table.contains_key(candidate) {
        return candidate.to_string();
    }
    if candidate.is_empty() {
        return normalized;
    }
    provider_prefixed_match(candidate, table)
        .or_else(|| version_prefix_match(candidate, table))
        .or_else(|| fuzzy_match(candidate, table))
        .unwrap_or(normalized)
}

fn alias_match(name: &str, table: &RateTable) -> Option<String> {
    let entry = aliases::lookup(name)?;
    if table.contains_key(entry.canonical) {
        return Some(entry.canonical.to_string());
    }
    entry
        .pricing_key
        .filter(|key| table.contains_key(*key))
        .map(str::to_string)
}

/// `openai/gpt-4.1`, `anthropic.claude-x`: shortest key wins, then lexicographic.
fn provider_prefixed_match(candidate: &str, table: &RateTable) -> Option<String> {
    let slash = format!("/{candidate}");
    let dot = format!(".{candidate}");
    table
        .keys()
        .filter(|k| k.ends_with(&slash) || k.ends_with(&dot))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// `gpt-5` → `gpt-5-2025-08-07`: longest key wins, then lexicographic.
fn version_prefix_match(candidate: &str, table: &RateTable) -> Option<String> {
    table
        .keys()
        .filter(|k| {
            k.strip_prefix(candidate).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with(['-', ':', '@'])
            })
        })
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .cloned()
}

fn alnum_canonical(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn digit_tokens(name: &str) -> Vec<&str> {
    name.split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Same digit runs, or one side's single run spells out the other side's runs
/// (`4o` vs `4-o` is fine, `3-5` vs `35` is fine, `3-5` vs `3-7` is not).
fn digits_compatible(a: &str, b: &str) -> bool {
    let ta = digit_tokens(a);
    let tb = digit_tokens(b);
    if ta == tb {
        return true;
    }
    let spelled = |single: &[&str], multi: &[&str]| {
        single.len() == 1 && multi.len() > 1 && single[0] == multi.concat()
    };
    spelled(&ta, &tb) || spelled(&tb, &ta)
}

// TODO: the single-run/concatenation rule lets `gpt-4-1` match a `gpt-41`
// key; revisit once there is a decision on version-digit strictness.
fn fuzzy_match(candidate: &str, table: &RateTable) -> Option<String> {
    let query = alnum_canonical(candidate);
    if query.is_empty() {
        return None;
    }
    let limit = 2.max(query.len() / 5);

    let mut best: Option<(usize, &String)> = None;
    for key in table.keys() {
        if !digits_compatible(candidate, key) {
            continue;
        }
        let distance = strsim::levenshtein(&query, &alnum_canonical(key));
        if distance > limit {
            continue;
        }
        let better = match best {
            None => true,
            Some((d, k)) => distance < d || (distance == d && key < k),
        };
        if better {
            best = Some((distance, key));
        }
    }
    best.map(|(_, key)| key.clone())
}
