use chrono::NaiveDate;

use crate::error::AppError;

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    let trimmed = s.trim();
    // Try YYYYMMDD
    if trimmed.len() == 8
        && let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y%m%d")
    {
        return Ok(d);
    }
    // Try YYYY-MM-DD
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(d);
    }
    Err(AppError::InvalidDate {
        input: s.to_string(),
    })
}

/// Parse an optional `--since`/`--until` pair and reject inverted ranges.
pub(crate) fn parse_date_range(
    since: Option<&str>,
    until: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
    let since = since.map(parse_date).transpose()?;
    let until = until.map(parse_date).transpose()?;
    if let (Some(s), Some(u)) = (since, until)
        && s > u
    {
        return Err(AppError::InvalidDateRange {
            since: s.to_string(),
            until: u.to_string(),
        });
    }
    Ok((since, until))
}
