//! Report aggregation
//!
//! Groups priced events by (period, source) and synthesizes the combined and
//! grand-total rows. Ancestors are always built from child aggregates, so the
//! `cost_incomplete` flag and the known-cost sum propagate upward together.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::consts::{ALL_SOURCES, COMBINED_SOURCE, TOTAL_PERIOD, UNKNOWN};
use crate::core::period::period_key;
use crate::core::types::{
    Granularity, ModelTotals, ReportRow, RowKind, UsageEvent, UsageTotals,
};
use crate::utils::Timezone;

/// Options controlling period bucketing and row order
#[derive(Debug, Clone)]
pub(crate) struct AggregateOptions<'a> {
    pub(crate) granularity: Granularity,
    pub(crate) timezone: Timezone,
    /// Sources listed here come first, in this order; the rest sort by name
    pub(crate) source_priority: &'a [String],
}

/// Totals plus per-model breakdown for one report node
#[derive(Debug, Default, Clone)]
struct Group {
    totals: UsageTotals,
    models: HashMap<String, UsageTotals>,
}

impl Group {
    fn add_event(&mut self, event: &UsageEvent) {
        self.totals.add_event(event);
        self.models
            .entry(model_key(event.model.as_deref()))
            .or_default()
            .add_event(event);
    }

    fn merge(&mut self, other: &Group) {
        self.totals.add(&other.totals);
        for (model, totals) in &other.models {
            self.models.entry(model.clone()).or_default().add(totals);
        }
    }

    fn into_row(self, kind: RowKind, period: &str, source: &str) -> ReportRow {
        let mut breakdown: Vec<ModelTotals> = self
            .models
            .into_iter()
            .map(|(model, totals)| ModelTotals { model, totals })
            .collect();
        breakdown.sort_by(|a, b| compare_model_names(&a.model, &b.model));

        ReportRow {
            kind,
            period: period.to_string(),
            source: source.to_string(),
            totals: self.totals,
            models: breakdown.iter().map(|m| m.model.clone()).collect(),
            model_breakdown: breakdown,
        }
    }
}

fn model_key(model: Option<&str>) -> String {
    match model.map(str::trim) {
        Some(m) if !m.is_empty() => m.to_lowercase(),
        _ => UNKNOWN.to_string(),
    }
}

/// Approximates locale collation: Unicode case-folded comparison first, then
/// lowercase before uppercase at the same position, then bytes so the sort is
/// total. Accent folding is not attempted.
fn compare_model_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| {
            let upper = |s: &str| s.chars().map(char::is_uppercase).collect::<Vec<_>>();
            upper(a).cmp(&upper(b))
        })
        .then_with(|| a.cmp(b))
}

fn compare_sources(a: &str, b: &str, priority: &[String]) -> Ordering {
    let rank = |s: &str| priority.iter().position(|p| p == s).unwrap_or(usize::MAX);
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

/// Build the ordered row set for rendering.
///
/// Emits, per period in ascending order, one `period_source` row per
/// contributing source and a `period_combined` row when more than one source
/// contributed; then exactly one `grand_total` row, even for no events.
pub(crate) fn aggregate_rows(events: &[UsageEvent], options: &AggregateOptions<'_>) -> Vec<ReportRow> {
    let mut periods: BTreeMap<String, HashMap<String, Group>> = BTreeMap::new();

    for event in events {
        let key = period_key(event.timestamp, options.granularity, options.timezone);
        periods
            .entry(key)
            .or_default()
            .entry(event.source.clone())
            .or_default()
            .add_event(event);
    }

    let mut rows = Vec::new();
    let mut grand = Group::default();

    for (period, sources) in periods {
        let mut ordered: Vec<(String, Group)> = sources.into_iter().collect();
        ordered.sort_by(|(a, _), (b, _)| compare_sources(a, b, options.source_priority));

        let mut combined = Group::default();
        let source_count = ordered.len();
        for (source, group) in ordered {
            combined.merge(&group);
            rows.push(group.into_row(RowKind::PeriodSource, &period, &source));
        }

        grand.merge(&combined);
        if source_count > 1 {
            rows.push(combined.into_row(RowKind::PeriodCombined, &period, COMBINED_SOURCE));
        }
    }

    if grand.totals.events == 0 {
        grand.totals = UsageTotals::zero();
    }
    rows.push(grand.into_row(RowKind::GrandTotal, TOTAL_PERIOD, ALL_SOURCES));
    rows
}
