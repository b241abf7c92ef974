use chrono::{DateTime, Utc};

use crate::consts::DATE_FORMAT;
use crate::core::types::Granularity;
use crate::utils::Timezone;

/// Bucket label for `timestamp`: "2025-01-15", "2025-W03" (ISO week) or "2025-01".
///
/// Labels of one granularity sort chronologically as plain strings.
pub(crate) fn period_key(
    timestamp: DateTime<Utc>,
    granularity: Granularity,
    timezone: Timezone,
) -> String {
    let date = timezone.local_date(timestamp);
    match granularity {
        Granularity::Daily => date.format(DATE_FORMAT).to_string(),
        Granularity::Weekly => date.format("%G-W%V").to_string(),
        Granularity::Monthly => date.format("%Y-%m").to_string(),
    }
}
