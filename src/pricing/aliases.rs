//! Known model spellings that do not match rate-table keys on their own

pub(super) struct AliasEntry {
    pub(super) spellings: &'static [&'static str],
    pub(super) canonical: &'static str,
    /// Dated key the rate table usually lists the model under
    pub(super) pricing_key: Option<&'static str>,
}

pub(super) static ALIASES: &[AliasEntry] = &[
    AliasEntry {
        spellings: &["claude-sonnet-4.5", "claude-4.5-sonnet", "sonnet-4.5"],
        canonical: "claude-sonnet-4-5",
        pricing_key: Some("claude-sonnet-4-5-20250929"),
    },
    AliasEntry {
        spellings: &["claude-sonnet-4", "claude-4-sonnet", "sonnet-4"],
        canonical: "claude-sonnet-4-20250514",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["claude-opus-4.1", "claude-4.1-opus", "opus-4.1"],
        canonical: "claude-opus-4-1",
        pricing_key: Some("claude-opus-4-1-20250805"),
    },
    AliasEntry {
        spellings: &["claude-opus-4", "claude-4-opus", "opus-4"],
        canonical: "claude-opus-4-20250514",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["claude-opus-4.5", "claude-4.5-opus", "opus-4.5"],
        canonical: "claude-opus-4-5",
        pricing_key: Some("claude-opus-4-5-20251101"),
    },
    AliasEntry {
        spellings: &["claude-haiku-4.5", "claude-4.5-haiku", "haiku-4.5"],
        canonical: "claude-haiku-4-5",
        pricing_key: Some("claude-haiku-4-5-20251001"),
    },
    AliasEntry {
        spellings: &["claude-3.7-sonnet", "claude-3-7-sonnet"],
        canonical: "claude-3-7-sonnet-20250219",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["claude-3.5-sonnet", "claude-3-5-sonnet"],
        canonical: "claude-3-5-sonnet-20241022",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["claude-3.5-haiku", "claude-3-5-haiku"],
        canonical: "claude-3-5-haiku-20241022",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["gpt5", "gpt-5.0"],
        canonical: "gpt-5",
        pricing_key: None,
    },
    AliasEntry {
        spellings: &["codex-mini", "codex-mini-latest"],
        canonical: "codex-mini-latest",
        pricing_key: None,
    },
];

/// Lower-case and collapse every run of punctuation or whitespace into `-`.
pub(super) fn punctuation_canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Alias entry for `name`, matching verbatim or by canonical form.
pub(super) fn lookup(name: &str) -> Option<&'static AliasEntry> {
    let canonical = punctuation_canonical(name);
    ALIASES.iter().find(|entry| {
        entry
            .spellings
            .iter()
            .any(|s| *s == name || punctuation_canonical(s) == canonical)
    })
}
