use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Invalid date \"{input}\" (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("Invalid date range: since {since} is after until {until}")]
    InvalidDateRange { since: String, until: String },

    #[error("Invalid timezone: {input}")]
    InvalidTimezone { input: String },

    #[error("Invalid --{filter} value \"{input}\": empty entry after splitting on ','")]
    EmptyFilterToken { filter: &'static str, input: String },

    #[error("Unknown source \"{input}\" (available: {available})")]
    UnknownSource { input: String, available: String },

    #[error("Invalid value for {name}: \"{value}\" ({expected})")]
    InvalidOverride {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to load requested sources: {details}")]
    SourceFailures { details: String },

    #[error("{0}")]
    Pricing(#[from] PricingError),

    #[error("Failed to parse config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("Failed to serialize report: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub(crate) enum PricingError {
    #[error("offline pricing requested but the pricing cache is unavailable")]
    OfflineCacheUnavailable,

    #[error("Failed to load pricing data")]
    Unavailable,

    #[error("Failed to load pricing data from {url}: {reason}")]
    CustomSource { url: String, reason: String },

    #[error("Pricing payload contains no usable model rates")]
    EmptyRateTable,

    #[error("Invalid pricing payload: {0}")]
    InvalidPayload(String),
}

/// Failure reported by a source adapter while discovering or parsing files.
#[derive(Debug, Error)]
pub(crate) enum SourceError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
