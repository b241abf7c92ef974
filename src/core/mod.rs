//! Core module - shared types and logic for all data sources

mod aggregator;
mod filter;
mod money;
mod period;
mod types;

pub(crate) use aggregator::{AggregateOptions, aggregate_rows};
pub(crate) use filter::{DateFilter, EventFilter, split_tokens};
pub(crate) use money::round_usd;
pub(crate) use types::{CostMode, Granularity, ReportRow, RowKind, UsageEvent};
