use hdrhistogram::Histogram;
use parking_lot::Mutex;
use stampede_summary_model::{CheckCounts, LatencySummary, RunSnapshot};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// One hour, in microseconds.
const MAX_TRACKED_LATENCY_MICROS: u64 = 60 * 60 * 1000 * 1000;

/// The outcome of evaluating one named check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub timestamp: SystemTime,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
            timestamp: SystemTime::now(),
        }
    }
}

struct RequestStats {
    count: u64,
    failures: u64,
    histogram: Option<Histogram<u64>>,
}

impl RequestStats {
    fn new() -> Self {
        let histogram =
            match Histogram::<u64>::new_with_bounds(1, MAX_TRACKED_LATENCY_MICROS, 3) {
                Ok(histogram) => Some(histogram),
                Err(e) => {
                    log::warn!("Failed to create latency histogram, latencies will not be tracked: {e:?}");
                    None
                }
            };

        Self {
            count: 0,
            failures: 0,
            histogram,
        }
    }

    fn summary(&self) -> LatencySummary {
        let mut summary = LatencySummary {
            count: self.count,
            failures: self.failures,
            ..Default::default()
        };

        if let Some(histogram) = self.histogram.as_ref().filter(|h| !h.is_empty()) {
            summary.min_ms = micros_to_ms(histogram.min());
            summary.mean_ms = histogram.mean() / 1000.0;
            summary.max_ms = micros_to_ms(histogram.max());
            summary.p50_ms = micros_to_ms(histogram.value_at_quantile(0.50));
            summary.p90_ms = micros_to_ms(histogram.value_at_quantile(0.90));
            summary.p95_ms = micros_to_ms(histogram.value_at_quantile(0.95));
            summary.p99_ms = micros_to_ms(histogram.value_at_quantile(0.99));
        }

        summary
    }
}

fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

#[derive(Default)]
struct AggregatorState {
    checks: BTreeMap<String, CheckCounts>,
    requests: BTreeMap<String, RequestStats>,
    iterations: u64,
    vus_started: u64,
    vus_completed: u64,
}

impl AggregatorState {
    fn request_stats(&mut self, label: &str) -> &mut RequestStats {
        self.requests
            .entry(label.to_string())
            .or_insert_with(RequestStats::new)
    }
}

/// Run-scoped collection point for results from every virtual user.
///
/// All updates go through a single lock so counts are exact. A [Aggregator::snapshot] sees every
/// update that completed before it took the lock.
#[derive(Default)]
pub struct Aggregator {
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_check(&self, result: CheckResult) {
        let mut state = self.state.lock();
        let counts = state.checks.entry(result.name).or_default();
        if result.passed {
            counts.passes += 1;
        } else {
            counts.fails += 1;
        }
    }

    pub fn record_latency(&self, label: &str, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX).max(1);

        let mut state = self.state.lock();
        let stats = state.request_stats(label);
        stats.count += 1;
        if let Some(histogram) = stats.histogram.as_mut() {
            histogram.saturating_record(micros);
        }
    }

    pub fn record_request_failure(&self, label: &str) {
        self.state.lock().request_stats(label).failures += 1;
    }

    pub fn record_iteration_complete(&self) {
        self.state.lock().iterations += 1;
    }

    pub fn record_vu_started(&self) {
        self.state.lock().vus_started += 1;
    }

    pub fn record_vu_completed(&self) {
        self.state.lock().vus_completed += 1;
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let state = self.state.lock();
        RunSnapshot {
            checks: state.checks.clone(),
            requests: state
                .requests
                .iter()
                .map(|(label, stats)| (label.clone(), stats.summary()))
                .collect(),
            iterations: state.iterations,
            vus_started: state.vus_started,
            vus_completed: state.vus_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_should_count_passes_and_fails_per_check() {
        let aggregator = Aggregator::new();

        aggregator.record_check(CheckResult::new("status 2xx", true));
        aggregator.record_check(CheckResult::new("status 2xx", false));
        aggregator.record_check(CheckResult::new("status 2xx", true));
        aggregator.record_check(CheckResult::new("body ok", false));

        let snapshot = aggregator.snapshot();
        assert_eq!(
            CheckCounts {
                passes: 2,
                fails: 1
            },
            snapshot.checks["status 2xx"]
        );
        assert_eq!(
            CheckCounts {
                passes: 0,
                fails: 1
            },
            snapshot.checks["body ok"]
        );
    }

    #[test]
    fn test_should_summarise_latencies() {
        let aggregator = Aggregator::new();

        for ms in 1..=100 {
            aggregator.record_latency("chat", Duration::from_millis(ms));
        }
        aggregator.record_request_failure("chat");

        let summary = &aggregator.snapshot().requests["chat"];
        assert_eq!(100, summary.count);
        assert_eq!(1, summary.failures);
        assert!((summary.min_ms - 1.0).abs() < 0.01);
        assert!((summary.max_ms - 100.0).abs() < 0.1);
        assert!((summary.p50_ms - 50.0).abs() < 0.1);
        assert!((summary.p99_ms - 99.0).abs() < 0.1);
        assert!((summary.mean_ms - 50.5).abs() < 0.1);
    }

    #[test]
    fn test_should_report_failures_without_latencies() {
        let aggregator = Aggregator::new();

        aggregator.record_request_failure("summary");

        let summary = &aggregator.snapshot().requests["summary"];
        assert_eq!(0, summary.count);
        assert_eq!(1, summary.failures);
        assert_eq!(0.0, summary.max_ms);
    }

    #[test]
    fn test_should_return_equal_snapshots_without_recording() {
        let aggregator = Aggregator::new();
        aggregator.record_check(CheckResult::new("a", true));
        aggregator.record_latency("chat", Duration::from_millis(12));
        aggregator.record_iteration_complete();

        pretty_assertions::assert_eq!(aggregator.snapshot(), aggregator.snapshot());
    }

    #[test]
    fn test_should_not_lose_concurrent_updates() {
        let aggregator = Arc::new(Aggregator::new());

        let handles = (0..8)
            .map(|_| {
                let aggregator = aggregator.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        aggregator.record_check(CheckResult::new("shared", i % 2 == 0));
                        aggregator.record_latency("req", Duration::from_micros(i + 1));
                        aggregator.record_iteration_complete();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(8000, snapshot.iterations);
        assert_eq!(8000, snapshot.checks["shared"].total());
        assert_eq!(4000, snapshot.checks["shared"].passes);
        assert_eq!(8000, snapshot.requests["req"].count);
    }
}
