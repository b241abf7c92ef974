use std::time::Duration;

/// Standard date format used throughout the codebase: "2025-01-15"
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Model key used when an event carries no model name
pub(crate) const UNKNOWN: &str = "unknown";

pub(crate) const DEFAULT_PRICING_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

pub(crate) const DEFAULT_CONCURRENCY: f64 = 8.0;
pub(crate) const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub(crate) const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(250);
pub(crate) const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source ordering for report rows when the config does not provide one
pub(crate) const DEFAULT_SOURCE_PRIORITY: &[&str] = &["claude", "codex"];

/// Source label on `period_combined` rows
pub(crate) const COMBINED_SOURCE: &str = "combined";
/// Source label and period key on the `grand_total` row
pub(crate) const ALL_SOURCES: &str = "all";
pub(crate) const TOTAL_PERIOD: &str = "total";
