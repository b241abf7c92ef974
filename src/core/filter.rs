//! Provider, date and model filtering over ingested events
//!
//! The stages run in a fixed order. Model tokens pick their matching mode
//! from the events that survived the provider and date stages.

use chrono::NaiveDate;

use crate::core::types::UsageEvent;
use crate::error::AppError;
use crate::utils::Timezone;

/// Inclusive date filter for queries
#[derive(Debug, Clone, Default)]
pub(crate) struct DateFilter {
    pub(crate) since: Option<NaiveDate>,
    pub(crate) until: Option<NaiveDate>,
}

impl DateFilter {
    pub(crate) fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        if let Some(s) = self.since
            && date < s
        {
            return false;
        }
        if let Some(u) = self.until
            && date > u
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Substring,
}

#[derive(Debug, Clone)]
pub(crate) struct EventFilter {
    provider: Option<String>,
    dates: DateFilter,
    models: Vec<String>,
    timezone: Timezone,
}

impl EventFilter {
    /// Validate raw filter inputs. Runs before any I/O.
    pub(crate) fn new(
        provider: Option<&str>,
        dates: DateFilter,
        model: Option<&str>,
        timezone: Timezone,
    ) -> Result<Self, AppError> {
        let provider = match provider {
            Some(raw) => {
                let token = raw.trim().to_lowercase();
                if token.is_empty() {
                    return Err(AppError::EmptyFilterToken {
                        filter: "provider",
                        input: raw.to_string(),
                    });
                }
                Some(token)
            }
            None => None,
        };
        let models = match model {
            Some(raw) => split_tokens(raw, "model")?,
            None => Vec::new(),
        };
        Ok(Self {
            provider,
            dates,
            models,
            timezone,
        })
    }

    pub(crate) fn apply(&self, events: Vec<UsageEvent>) -> Vec<UsageEvent> {
        let survivors: Vec<UsageEvent> = events
            .into_iter()
            .filter(|e| self.provider_matches(e))
            .filter(|e| self.dates.contains(self.timezone.local_date(e.timestamp)))
            .collect();

        if self.models.is_empty() {
            return survivors;
        }

        let modes = self.model_modes(&survivors);
        survivors
            .into_iter()
            .filter(|e| {
                let Some(model) = e.model.as_deref() else {
                    return false;
                };
                let model = model.to_lowercase();
                self.models
                    .iter()
                    .zip(&modes)
                    .any(|(token, mode)| match mode {
                        MatchMode::Exact => model == *token,
                        MatchMode::Substring => model.contains(token.as_str()),
                    })
            })
            .collect()
    }

    fn provider_matches(&self, event: &UsageEvent) -> bool {
        match &self.provider {
            None => true,
            Some(token) => event
                .provider
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(token.as_str())),
        }
    }

    /// One mode per token, decided once for the whole run.
    fn model_modes(&self, events: &[UsageEvent]) -> Vec<MatchMode> {
        self.models
            .iter()
            .map(|token| {
                let exact = events
                    .iter()
                    .filter_map(|e| e.model.as_deref())
                    .any(|m| m.to_lowercase() == *token);
                if exact {
                    MatchMode::Exact
                } else {
                    MatchMode::Substring
                }
            })
            .collect()
    }
}

/// Split a comma-separated filter into lower-cased tokens, rejecting blanks.
pub(crate) fn split_tokens(raw: &str, filter: &'static str) -> Result<Vec<String>, AppError> {
    raw.split(',')
        .map(|part| {
            let token = part.trim().to_lowercase();
            if token.is_empty() {
                Err(AppError::EmptyFilterToken {
                    filter,
                    input: raw.to_string(),
                })
            } else {
                Ok(token)
            }
        })
        .collect()
}
