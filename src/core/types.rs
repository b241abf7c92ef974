//! Core data types shared across all data sources
//!
//! Every source adapter converts its native records into [`UsageEvent`];
//! everything downstream (filtering, pricing, aggregation) works on that.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::money::Money;

/// How an event's `cost_usd` came to be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CostMode {
    /// Cost reported by the source itself
    Explicit,
    /// Cost computed (or attempted) from the rate table
    #[default]
    Estimated,
}

/// One unit of token usage reported by a source
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UsageEvent {
    pub(crate) source: String,
    pub(crate) session_id: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) repo_root: Option<String>,
    pub(crate) provider: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) input_tokens: u64,
    pub(crate) output_tokens: u64,
    pub(crate) reasoning_tokens: u64,
    pub(crate) cache_read_tokens: u64,
    pub(crate) cache_write_tokens: u64,
    /// As reported; not required to equal the sum of the other counters
    pub(crate) total_tokens: u64,
    pub(crate) cost_usd: Option<f64>,
    pub(crate) cost_mode: CostMode,
}

impl UsageEvent {
    pub(crate) fn new(
        source: impl Into<String>,
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            session_id: session_id.into(),
            timestamp,
            repo_root: None,
            provider: None,
            model: None,
            input_tokens: 0,
            output_tokens: 0,
            reasoning_tokens: 0,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
            total_tokens: 0,
            cost_usd: None,
            cost_mode: CostMode::Estimated,
        }
    }

    pub(crate) fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub(crate) fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set input/output counters and a matching total.
    #[cfg(test)]
    pub(crate) fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self.total_tokens = input + output;
        self
    }

    pub(crate) fn with_explicit_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = Some(cost_usd);
        self.cost_mode = CostMode::Explicit;
        self
    }
}

/// Calendar bucket size for report periods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

/// Token and cost accumulator for one report node
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub(crate) struct UsageTotals {
    pub(crate) input_tokens: u64,
    pub(crate) output_tokens: u64,
    pub(crate) reasoning_tokens: u64,
    pub(crate) cache_read_tokens: u64,
    pub(crate) cache_write_tokens: u64,
    pub(crate) total_tokens: u64,
    pub(crate) cost_usd: Option<Money>,
    pub(crate) cost_incomplete: bool,
    pub(crate) events: u64,
}

impl UsageTotals {
    pub(crate) fn add_event(&mut self, event: &UsageEvent) {
        self.input_tokens = self.input_tokens.saturating_add(event.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(event.output_tokens);
        self.reasoning_tokens = self.reasoning_tokens.saturating_add(event.reasoning_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(event.cache_read_tokens);
        self.cache_write_tokens = self.cache_write_tokens.saturating_add(event.cache_write_tokens);
        self.total_tokens = self.total_tokens.saturating_add(event.total_tokens);
        self.events += 1;
        match event.cost_usd {
            Some(cost) => self.add_cost(Money::from_usd(cost)),
            None => self.cost_incomplete = true,
        }
    }

    /// Fold a child aggregate into this one.
    pub(crate) fn add(&mut self, other: &UsageTotals) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.reasoning_tokens = self.reasoning_tokens.saturating_add(other.reasoning_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(other.cache_read_tokens);
        self.cache_write_tokens = self.cache_write_tokens.saturating_add(other.cache_write_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
        self.events += other.events;
        if let Some(cost) = other.cost_usd {
            self.add_cost(cost);
        }
        self.cost_incomplete |= other.cost_incomplete;
    }

    fn add_cost(&mut self, cost: Money) {
        self.cost_usd = Some(self.cost_usd.unwrap_or(Money::ZERO) + cost);
    }

    /// All-zero totals with a known zero cost (the empty grand total)
    pub(crate) fn zero() -> Self {
        Self {
            cost_usd: Some(Money::ZERO),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RowKind {
    PeriodSource,
    PeriodCombined,
    GrandTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ModelTotals {
    pub(crate) model: String,
    #[serde(flatten)]
    pub(crate) totals: UsageTotals,
}

/// One row of the aggregated report, handed unmodified to renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ReportRow {
    pub(crate) kind: RowKind,
    pub(crate) period: String,
    pub(crate) source: String,
    #[serde(flatten)]
    pub(crate) totals: UsageTotals,
    pub(crate) models: Vec<String>,
    pub(crate) model_breakdown: Vec<ModelTotals>,
}
