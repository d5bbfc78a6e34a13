mod checks_table;
mod requests_table;

use crate::report::summary_report::checks_table::CheckRow;
use crate::report::summary_report::requests_table::RequestRow;
use crate::report::ReportCollector;
use stampede_summary_model::RunSummary;
use std::fmt::Write;
use std::time::Duration;
use tabled::settings::Style;
use tabled::Table;

/// Prints a human readable summary of checks and requests at the end of the run.
pub struct SummaryReportCollector;

impl SummaryReportCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, summary: &RunSummary) -> String {
        let snapshot = &summary.snapshot;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "\nScenario `{}` against {} with {} VUs for {:?}",
            summary.scenario_name,
            summary.base_url,
            summary.concurrency,
            Duration::from_millis(summary.run_duration_ms)
        );

        if !snapshot.checks.is_empty() {
            let rows = snapshot
                .checks
                .iter()
                .map(|(name, counts)| CheckRow {
                    check: name.clone(),
                    passes: counts.passes,
                    fails: counts.fails,
                    pass_rate: counts.pass_rate(),
                })
                .collect::<Vec<_>>();

            let mut table = Table::new(rows);
            table.with(Style::modern());
            let _ = writeln!(out, "\nSummary of checks\n{table}");
        }

        if !snapshot.requests.is_empty() {
            let rows = snapshot
                .requests
                .iter()
                .map(|(label, latency)| RequestRow {
                    request: label.clone(),
                    count: latency.count,
                    failures: latency.failures,
                    avg_time_ms: latency.mean_ms,
                    min_time_ms: latency.min_ms,
                    p50_ms: latency.p50_ms,
                    p90_ms: latency.p90_ms,
                    p95_ms: latency.p95_ms,
                    p99_ms: latency.p99_ms,
                    max_time_ms: latency.max_ms,
                })
                .collect::<Vec<_>>();

            let mut table = Table::new(rows);
            table.with(Style::modern());
            let _ = writeln!(out, "\nSummary of requests\n{table}");
        }

        let _ = writeln!(
            out,
            "\nIterations: {}, VUs started: {}, VUs completed: {}",
            snapshot.iterations, snapshot.vus_started, snapshot.vus_completed
        );

        out
    }
}

impl Default for SummaryReportCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollector for SummaryReportCollector {
    fn finalize(&self, summary: &RunSummary) -> anyhow::Result<()> {
        println!("{}", self.render(summary));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_summary_model::{CheckCounts, LatencySummary, RunSnapshot};

    #[test]
    fn test_should_render_checks_and_requests() {
        let mut summary = RunSummary::new(
            "run".to_string(),
            "chat_summary".to_string(),
            0,
            120_000,
            30,
            "http://localhost:8080".to_string(),
            "0.1.0".to_string(),
        );
        let mut snapshot = RunSnapshot {
            iterations: 4,
            vus_started: 30,
            vus_completed: 30,
            ..Default::default()
        };
        snapshot.checks.insert(
            "chat status 2xx".to_string(),
            CheckCounts {
                passes: 3,
                fails: 1,
            },
        );
        snapshot.requests.insert(
            "chat".to_string(),
            LatencySummary {
                count: 4,
                mean_ms: 12.346,
                ..Default::default()
            },
        );
        summary.set_snapshot(snapshot);

        let rendered = SummaryReportCollector::new().render(&summary);

        assert!(rendered.contains("chat status 2xx"));
        assert!(rendered.contains("75.00%"));
        assert!(rendered.contains("12.35"));
        assert!(rendered.contains("with 30 VUs for 120s"));
        assert!(rendered.contains("Iterations: 4, VUs started: 30, VUs completed: 30"));
    }

    #[test]
    fn test_should_render_sub_second_duration() {
        let summary = RunSummary::new(
            "run".to_string(),
            "short".to_string(),
            0,
            500,
            1,
            "http://localhost:8080".to_string(),
            "0.1.0".to_string(),
        );

        let rendered = SummaryReportCollector::new().render(&summary);

        assert!(rendered.contains("with 1 VUs for 500ms"), "{rendered}");
    }
}
