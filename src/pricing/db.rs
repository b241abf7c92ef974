use chrono::Duration as ChronoDuration;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::cache::PricingCache;
use super::provider::RateTableFetcher;
use super::resolver::{normalize_model, resolve_model};
use super::retry::{Clock, RetryPolicy};
use super::types::{ModelPricing, PricingCachePayload, PricingOrigin, normalize_rate_table};
use crate::consts::DEFAULT_PRICING_URL;
use crate::error::PricingError;

/// Rate table plus a per-instance memo of resolved model names
#[derive(Debug, Default)]
pub(crate) struct PricingDb {
    models: HashMap<String, ModelPricing>,
    resolved: RefCell<HashMap<String, String>>,
}

impl PricingDb {
    pub(crate) fn new(models: HashMap<String, ModelPricing>) -> Self {
        let mut db = Self::default();
        db.set_models(models);
        db
    }

    /// Replace the rate table; earlier resolutions no longer apply.
    pub(crate) fn set_models(&mut self, models: HashMap<String, ModelPricing>) {
        self.models = models;
        self.resolved.get_mut().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.models.len()
    }

    /// Rate-table key `model` resolves to, or its normalized name if none.
    pub(crate) fn resolve(&self, model: &str) -> String {
        let key = normalize_model(model);
        if let Some(cached) = self.resolved.borrow().get(&key) {
            return cached.clone();
        }
        let resolved = resolve_model(&key, &self.models);
        self.resolved.borrow_mut().insert(key, resolved.clone());
        resolved
    }

    pub(crate) fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(&self.resolve(model))
    }
}

/// Inputs of one pricing load
#[derive(Debug, Clone)]
pub(crate) struct PricingSettings {
    pub(crate) url: String,
    pub(crate) offline: bool,
    pub(crate) cache_ttl: Duration,
}

impl PricingSettings {
    fn is_custom_url(&self) -> bool {
        self.url != DEFAULT_PRICING_URL
    }
}

/// Loaded rate table and where it came from
#[derive(Debug)]
pub(crate) struct LoadedPricing {
    pub(crate) db: PricingDb,
    pub(crate) origin: PricingOrigin,
}

/// Fresh cache, then offline cache, then network with retry, then stale cache.
pub(crate) struct PricingLoader {
    pub(crate) settings: PricingSettings,
    pub(crate) cache: PricingCache,
    pub(crate) fetcher: Arc<dyn RateTableFetcher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retry: RetryPolicy,
}

impl PricingLoader {
    fn is_fresh(&self, payload: &PricingCachePayload) -> bool {
        let Ok(ttl) = ChronoDuration::from_std(self.settings.cache_ttl) else {
            return false;
        };
        let age = self.clock.now() - payload.fetched_at;
        age >= ChronoDuration::zero() && age <= ttl
    }

    pub(crate) async fn load(&self) -> Result<LoadedPricing, PricingError> {
        let start = Instant::now();
        let url = self.settings.url.as_str();

        let cached = self
            .cache
            .read()
            .await
            .filter(|payload| payload.source_url == url);

        if let Some(payload) = &cached
            && self.is_fresh(payload)
        {
            debug!(models = payload.pricing_by_model.len(), "Using cached pricing");
            return Ok(loaded(payload.pricing_by_model.clone(), PricingOrigin::Cache));
        }

        if self.settings.offline {
            return match cached {
                Some(payload) => {
                    debug!(models = payload.pricing_by_model.len(), "Using cached pricing (offline)");
                    Ok(loaded(payload.pricing_by_model, PricingOrigin::OfflineCache))
                }
                None => Err(PricingError::OfflineCacheUnavailable),
            };
        }

        debug!(url, "Fetching pricing");
        let fetched = self
            .retry
            .run(|_| self.fetcher.fetch(url))
            .await
            .map_err(|e| e.to_string())
            .and_then(|doc| normalize_rate_table(doc).map_err(|e| e.to_string()));

        match fetched {
            Ok(models) => {
                info!(
                    models = models.len(),
                    elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Fetched pricing"
                );
                let payload = PricingCachePayload {
                    fetched_at: self.clock.now(),
                    source_url: url.to_string(),
                    pricing_by_model: models,
                };
                if let Err(err) = self.cache.write(&payload).await {
                    warn!(error = %err, "Failed to write pricing cache");
                }
                Ok(loaded(payload.pricing_by_model, PricingOrigin::Network))
            }
            Err(reason) => {
                if let Some(payload) = cached {
                    warn!(reason = %reason, "Pricing fetch failed, using stale cache");
                    return Ok(loaded(payload.pricing_by_model, PricingOrigin::StaleCache));
                }
                if self.settings.is_custom_url() {
                    Err(PricingError::CustomSource {
                        url: url.to_string(),
                        reason,
                    })
                } else {
                    debug!(reason = %reason, "Pricing fetch failed");
                    Err(PricingError::Unavailable)
                }
            }
        }
    }
}

fn loaded(models: HashMap<String, ModelPricing>, origin: PricingOrigin) -> LoadedPricing {
    LoadedPricing {
        db: PricingDb::new(models),
        origin,
    }
}
