//! Report pipeline: validate, ingest, filter, price, aggregate

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{ActiveOverride, Settings};
use crate::consts::DEFAULT_PRICING_URL;
use crate::core::{
    AggregateOptions, DateFilter, EventFilter, Granularity, ReportRow, UsageEvent, aggregate_rows,
};
use crate::error::{AppError, PricingError};
use crate::pricing::{
    Clock, PricingCache, PricingDb, PricingLoader, PricingOrigin, PricingSettings,
    RateTableFetcher, RetryPolicy, Sleeper, SystemClock, TokioSleeper, UreqFetcher, apply_cost,
    needs_pricing,
};
use crate::source::{SharedSource, SourceFailure, SourceReport, default_sources, ingest, select_sources};
use crate::utils::parse_date_range;

/// What to report on, as given on the command line
#[derive(Debug, Clone, Default)]
pub(crate) struct ReportRequest {
    pub(crate) granularity: Granularity,
    pub(crate) since: Option<String>,
    pub(crate) until: Option<String>,
    pub(crate) provider: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) source: Option<String>,
}

/// Everything the pipeline talks to outside itself
pub(crate) struct Runtime {
    pub(crate) sources: Vec<SharedSource>,
    pub(crate) fetcher: Arc<dyn RateTableFetcher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
}

impl Runtime {
    pub(crate) fn production(settings: &Settings) -> Self {
        Self {
            sources: default_sources(&settings.sources),
            fetcher: Arc::new(UreqFetcher::default()),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Diagnostics {
    pub(crate) timezone: String,
    pub(crate) sources: Vec<SourceReport>,
    pub(crate) source_failures: Vec<SourceFailure>,
    pub(crate) pricing_origin: Option<PricingOrigin>,
    pub(crate) pricing_warning: Option<String>,
    pub(crate) env_overrides: Vec<ActiveOverride>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportOutput {
    pub(crate) rows: Vec<ReportRow>,
    pub(crate) diagnostics: Diagnostics,
}

struct PricingOutcome {
    db: Option<PricingDb>,
    origin: Option<PricingOrigin>,
    warning: Option<String>,
}

async fn load_pricing(
    settings: &Settings,
    runtime: &Runtime,
    events: &[UsageEvent],
) -> Result<PricingOutcome, AppError> {
    let forced = settings.offline || settings.pricing_url != DEFAULT_PRICING_URL;
    if !needs_pricing(events, forced) {
        debug!("All events already priced, skipping pricing load");
        return Ok(PricingOutcome {
            db: None,
            origin: None,
            warning: None,
        });
    }

    let loader = PricingLoader {
        settings: PricingSettings {
            url: settings.pricing_url.clone(),
            offline: settings.offline,
            cache_ttl: settings.cache_ttl,
        },
        cache: PricingCache::in_dir(settings.cache_dir.clone()),
        fetcher: runtime.fetcher.clone(),
        clock: runtime.clock.clone(),
        retry: RetryPolicy::new(settings.fetch_attempts, settings.retry_base)
            .with_sleeper(runtime.sleeper.clone()),
    };

    match loader.load().await {
        Ok(loaded) => {
            info!(origin = ?loaded.origin, models = loaded.db.len(), "Pricing loaded");
            Ok(PricingOutcome {
                db: Some(loaded.db),
                origin: Some(loaded.origin),
                warning: None,
            })
        }
        Err(PricingError::OfflineCacheUnavailable) => {
            Err(PricingError::OfflineCacheUnavailable.into())
        }
        Err(err) if settings.ignore_pricing_failures => {
            warn!(error = %err, "Continuing without pricing");
            Ok(PricingOutcome {
                db: None,
                origin: None,
                warning: Some(err.to_string()),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Run one report end to end.
///
/// Every validation error surfaces before any file or network I/O.
pub(crate) async fn run_report(
    request: &ReportRequest,
    settings: &Settings,
    runtime: Runtime,
) -> Result<ReportOutput, AppError> {
    let start = Instant::now();

    let (since, until) = parse_date_range(request.since.as_deref(), request.until.as_deref())?;
    let filter = EventFilter::new(
        request.provider.as_deref(),
        DateFilter::new(since, until),
        request.model.as_deref(),
        settings.timezone,
    )?;
    let (selected, mut explicit) = select_sources(runtime.sources.clone(), request.source.as_deref())?;
    explicit.extend(settings.sources.explicit_ids());

    let outcome = ingest(&selected, &explicit, settings.concurrency).await?;
    let events = filter.apply(outcome.events);
    debug!(events = events.len(), "Events after filtering");

    let pricing = load_pricing(settings, &runtime, &events).await?;
    let events: Vec<UsageEvent> = events
        .into_iter()
        .map(|e| apply_cost(e, pricing.db.as_ref()))
        .collect();

    let rows = aggregate_rows(
        &events,
        &AggregateOptions {
            granularity: request.granularity,
            timezone: settings.timezone,
            source_priority: &settings.source_priority,
        },
    );
    debug!(
        rows = rows.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Report built"
    );

    Ok(ReportOutput {
        rows,
        diagnostics: Diagnostics {
            timezone: settings.timezone.label(),
            sources: outcome.reports,
            source_failures: outcome.failures,
            pricing_origin: pricing.origin,
            pricing_warning: pricing.warning,
            env_overrides: settings.active_overrides.clone(),
        },
    })
}
