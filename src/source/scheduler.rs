//! Bounded-concurrency ingestion across all selected sources
//!
//! Adapters run side by side; within one adapter a fixed pool of workers
//! pulls file indices from a shared counter until the list is exhausted.
//! Each adapter's results are collected as a unit, so diagnostics keep the
//! caller's adapter order.

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crate::core::UsageEvent;
use crate::error::{AppError, SourceError};
use crate::source::{ParsedFile, SharedSource, SourceAdapter};

/// A source that failed softly and contributed no events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SourceFailure {
    pub(crate) source: String,
    pub(crate) reason: String,
}

/// Per-source ingestion diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct SourceReport {
    pub(crate) source: String,
    pub(crate) files_found: usize,
    pub(crate) events: usize,
    pub(crate) skipped_rows: u64,
    pub(crate) skipped_reasons: Vec<(String, u64)>,
    pub(crate) failure: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct IngestOutcome {
    pub(crate) events: Vec<UsageEvent>,
    pub(crate) reports: Vec<SourceReport>,
    pub(crate) failures: Vec<SourceFailure>,
}

/// `max(1, floor(limit))`; non-finite or non-positive limits become 1.
pub(crate) fn clamp_concurrency(limit: f64) -> usize {
    if !limit.is_finite() || limit < 1.0 {
        return 1;
    }
    limit.floor() as usize
}

/// NaN, infinite and negative counts are treated as zero.
fn normalize_count(count: f64) -> u64 {
    if count.is_finite() && count > 0.0 {
        count.floor() as u64
    } else {
        0
    }
}

struct AdapterRun {
    events: Vec<UsageEvent>,
    report: SourceReport,
}

async fn parse_worker(
    adapter: &dyn SourceAdapter,
    files: &[PathBuf],
    next: &AtomicUsize,
    failed: &AtomicBool,
) -> Vec<(usize, Result<ParsedFile, SourceError>)> {
    let mut results = Vec::new();
    while !failed.load(Ordering::Relaxed) {
        let index = next.fetch_add(1, Ordering::Relaxed);
        let Some(path) = files.get(index) else {
            break;
        };
        let result = adapter.parse_file(path).await;
        if let Err(err) = &result {
            debug!(source = adapter.id(), file = %path.display(), error = %err, "Parse failed");
            failed.store(true, Ordering::Relaxed);
        }
        results.push((index, result));
    }
    results
}

async fn ingest_adapter(adapter: &dyn SourceAdapter, limit: usize) -> AdapterRun {
    let source = adapter.id().to_string();
    let start = Instant::now();

    let files = match adapter.discover().await {
        Ok(files) => files,
        Err(err) => {
            return AdapterRun {
                events: Vec::new(),
                report: SourceReport {
                    source,
                    failure: Some(err.to_string()),
                    ..SourceReport::default()
                },
            };
        }
    };
    debug!(source = %source, files = files.len(), "Discovered files");

    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let worker_count = limit.min(files.len());
    let workers = (0..worker_count).map(|_| parse_worker(adapter, &files, &next, &failed));
    let mut results: Vec<(usize, Result<ParsedFile, SourceError>)> =
        join_all(workers).await.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);

    let mut report = SourceReport {
        source,
        files_found: files.len(),
        ..SourceReport::default()
    };
    let mut events = Vec::new();

    for (_, result) in results {
        match result {
            Ok(parsed) => {
                events.extend(parsed.events);
                if let Some(skipped) = parsed.skipped {
                    merge_skipped(&mut report, skipped.count, skipped.reasons);
                }
            }
            Err(err) => {
                // Lowest failing index wins; the source contributes nothing
                report.failure = Some(err.to_string());
                report.skipped_rows = 0;
                report.skipped_reasons.clear();
                events.clear();
                break;
            }
        }
    }

    if report.failure.is_none() {
        report.events = events.len();
    }
    debug!(
        source = %report.source,
        files = report.files_found,
        events = report.events,
        skipped = report.skipped_rows,
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Parsed source"
    );
    AdapterRun { events, report }
}

fn merge_skipped(report: &mut SourceReport, count: f64, reasons: Vec<(String, f64)>) {
    report.skipped_rows += normalize_count(count);
    for (reason, n) in reasons {
        let n = normalize_count(n);
        match report.skipped_reasons.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, total)) => *total += n,
            None => report.skipped_reasons.push((reason, n)),
        }
    }
}

/// Run every adapter and fold the results.
///
/// Failures of sources in `explicit` abort the run with one combined error;
/// any other failure is recorded and that source contributes zero events.
pub(crate) async fn ingest(
    adapters: &[SharedSource],
    explicit: &HashSet<String>,
    concurrency: f64,
) -> Result<IngestOutcome, AppError> {
    let limit = clamp_concurrency(concurrency);
    let runs = join_all(adapters.iter().map(|a| ingest_adapter(a.as_ref(), limit))).await;

    let mut outcome = IngestOutcome::default();
    let mut fatal = Vec::new();

    for run in runs {
        if let Some(reason) = &run.report.failure {
            let source = run.report.source.clone();
            if explicit.contains(&source) {
                fatal.push(format!("{source}: {reason}"));
            } else {
                warn!(source = %source, reason = %reason, "Skipping source after failure");
                outcome.failures.push(SourceFailure {
                    source,
                    reason: reason.clone(),
                });
            }
        }
        outcome.events.extend(run.events);
        outcome.reports.push(run.report);
    }

    if !fatal.is_empty() {
        return Err(AppError::SourceFailures {
            details: fatal.join("; "),
        });
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::Mutex;

    use crate::source::SkippedRows;

    /// Fake adapter: one event per file, optional failures and skip reports
    struct FakeSource {
        id: &'static str,
        files: usize,
        fail_on: Option<usize>,
        discover_error: Option<&'static str>,
        skipped: Option<SkippedRows>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        parsed: Mutex<Vec<PathBuf>>,
    }

    impl FakeSource {
        fn new(id: &'static str, files: usize) -> Self {
            Self {
                id,
                files,
                fail_on: None,
                discover_error: None,
                skipped: None,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                parsed: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, index: usize) -> Self {
            self.fail_on = Some(index);
            self
        }
    }

    #[async_trait]
    impl SourceAdapter for FakeSource {
        fn id(&self) -> &str {
            self.id
        }

        async fn discover(&self) -> Result<Vec<PathBuf>, SourceError> {
            if let Some(reason) = self.discover_error {
                return Err(SourceError::Other(reason.to_string()));
            }
            Ok((0..self.files).map(|i| PathBuf::from(format!("{i}"))).collect())
        }

        async fn parse_file(&self, path: &Path) -> Result<ParsedFile, SourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.parsed.lock().unwrap().push(path.to_path_buf());

            let index: usize = path.to_string_lossy().parse().unwrap();
            if self.fail_on == Some(index) {
                return Err(SourceError::Other("disk error".to_string()));
            }
            let ts: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
            let event = UsageEvent::new(self.id, format!("s{index}"), ts).with_tokens(1, 1);
            Ok(ParsedFile {
                events: vec![event],
                skipped: self.skipped.clone(),
            })
        }
    }

    fn shared(sources: Vec<FakeSource>) -> Vec<SharedSource> {
        sources
            .into_iter()
            .map(|s| Arc::new(s) as SharedSource)
            .collect()
    }

    fn explicit(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clamp_handles_degenerate_limits() {
        assert_eq!(clamp_concurrency(4.0), 4);
        assert_eq!(clamp_concurrency(2.9), 2);
        assert_eq!(clamp_concurrency(0.5), 1);
        assert_eq!(clamp_concurrency(0.0), 1);
        assert_eq!(clamp_concurrency(-3.0), 1);
        assert_eq!(clamp_concurrency(f64::NAN), 1);
        assert_eq!(clamp_concurrency(f64::INFINITY), 1);
    }

    #[test]
    fn normalize_count_zeroes_invalid_values() {
        assert_eq!(normalize_count(3.0), 3);
        assert_eq!(normalize_count(f64::NAN), 0);
        assert_eq!(normalize_count(-2.0), 0);
    }

    #[tokio::test]
    async fn every_file_is_parsed_exactly_once() {
        let source = Arc::new(FakeSource::new("pi", 25));
        let adapters: Vec<SharedSource> = vec![source.clone()];
        let outcome = ingest(&adapters, &HashSet::new(), 4.0).await.unwrap();

        assert_eq!(outcome.events.len(), 25);
        let mut parsed = source.parsed.lock().unwrap().clone();
        assert_eq!(parsed.len(), 25);
        parsed.sort();
        parsed.dedup();
        assert_eq!(parsed.len(), 25);
        assert!(source.peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(outcome.reports[0].files_found, 25);
        assert_eq!(outcome.reports[0].events, 25);
    }

    #[tokio::test]
    async fn invalid_limit_falls_back_to_one_worker() {
        let source = Arc::new(FakeSource::new("pi", 5));
        let adapters: Vec<SharedSource> = vec![source.clone()];
        let outcome = ingest(&adapters, &HashSet::new(), f64::NAN).await.unwrap();
        assert_eq!(outcome.events.len(), 5);
        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_failure_rejects_run_with_named_reason() {
        let adapters = shared(vec![FakeSource::new("codex", 3).failing(1)]);
        let err = ingest(&adapters, &explicit(&["codex"]), 2.0).await.unwrap_err();
        assert!(matches!(err, AppError::SourceFailures { .. }));
        assert!(err.to_string().contains("codex: disk error"));
    }

    #[tokio::test]
    async fn explicit_failures_are_combined() {
        let adapters = shared(vec![
            FakeSource::new("pi", 2).failing(0),
            FakeSource::new("codex", 2).failing(1),
        ]);
        let err = ingest(&adapters, &explicit(&["pi", "codex"]), 1.0)
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("pi: disk error"));
        assert!(err.contains("codex: disk error"));
    }

    #[tokio::test]
    async fn implicit_failure_is_recorded_and_run_continues() {
        let adapters = shared(vec![
            FakeSource::new("pi", 2),
            FakeSource::new("codex", 3).failing(2),
        ]);
        let outcome = ingest(&adapters, &HashSet::new(), 8.0).await.unwrap();

        assert!(outcome.events.iter().all(|e| e.source == "pi"));
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(
            outcome.failures,
            vec![SourceFailure {
                source: "codex".to_string(),
                reason: "disk error".to_string(),
            }]
        );
        let order: Vec<&str> = outcome.reports.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(order, vec!["pi", "codex"]);
        assert_eq!(outcome.reports[1].events, 0);
        assert_eq!(outcome.reports[1].failure.as_deref(), Some("disk error"));
    }

    #[tokio::test]
    async fn discovery_failure_counts_as_source_failure() {
        let mut source = FakeSource::new("pi", 0);
        source.discover_error = Some("permission denied");
        let adapters = shared(vec![source]);
        let outcome = ingest(&adapters, &HashSet::new(), 2.0).await.unwrap();
        assert_eq!(outcome.failures[0].reason, "permission denied");
    }

    #[tokio::test]
    async fn skipped_rows_are_normalized_and_summed() {
        let mut source = FakeSource::new("pi", 3);
        source.skipped = Some(SkippedRows {
            count: f64::NAN,
            reasons: vec![("invalid json".to_string(), 2.0), ("bad".to_string(), -1.0)],
        });
        let adapters = shared(vec![source]);
        let outcome = ingest(&adapters, &HashSet::new(), 2.0).await.unwrap();
        let report = &outcome.reports[0];
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(
            report.skipped_reasons,
            vec![("invalid json".to_string(), 6), ("bad".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn failed_source_reports_no_skipped_rows() {
        let mut source = FakeSource::new("codex", 3).failing(2);
        source.skipped = Some(SkippedRows {
            count: 1.0,
            reasons: vec![("invalid json".to_string(), 1.0)],
        });
        let adapters = shared(vec![source]);
        let outcome = ingest(&adapters, &HashSet::new(), 1.0).await.unwrap();
        let report = &outcome.reports[0];
        assert_eq!(report.failure.as_deref(), Some("disk error"));
        assert_eq!(report.events, 0);
        assert_eq!(report.skipped_rows, 0);
        assert!(report.skipped_reasons.is_empty());
    }

    #[tokio::test]
    async fn empty_source_is_not_a_failure() {
        let adapters = shared(vec![FakeSource::new("pi", 0)]);
        let outcome = ingest(&adapters, &explicit(&["pi"]), 2.0).await.unwrap();
        assert!(outcome.events.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
