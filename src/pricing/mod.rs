//! Rate-table loading, model resolution and per-event costing

mod aliases;
mod cache;
mod cost;
mod db;
mod provider;
mod resolver;
mod retry;
mod types;

pub(crate) use cache::{PricingCache, default_cache_dir};
pub(crate) use cost::{apply_cost, needs_pricing};
pub(crate) use db::{PricingDb, PricingLoader, PricingSettings};
pub(crate) use provider::{RateTableFetcher, UreqFetcher};
pub(crate) use retry::{Clock, RetryPolicy, Sleeper, SystemClock, TokioSleeper};
pub(crate) use types::PricingOrigin;

#[cfg(test)]
pub(crate) use provider::FetchError;
#[cfg(test)]
pub(crate) use retry::testing;
