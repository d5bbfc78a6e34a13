mod json_report;
mod summary_report;

use stampede_summary_model::RunSummary;
use std::path::PathBuf;

use crate::aggregator::Aggregator;

pub use json_report::JsonReportCollector;
pub use summary_report::SummaryReportCollector;

/// A sink for the final result of a run.
pub trait ReportCollector {
    fn finalize(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

/// Choose which report collectors should receive the run summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    summary: bool,
    json_file: Option<PathBuf>,
}

impl ReportConfig {
    /// Print a table of checks and requests to stdout at the end of the run.
    pub fn enable_summary(mut self) -> Self {
        self.summary = true;
        self
    }

    /// Append the run summary as a JSON line to the given file.
    pub fn enable_json_file(mut self, path: PathBuf) -> Self {
        self.json_file = Some(path);
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector + Send + Sync>> = Vec::new();
        if self.summary {
            collectors.push(Box::new(SummaryReportCollector::new()));
        }
        if let Some(path) = self.json_file {
            collectors.push(Box::new(JsonReportCollector::new(path)));
        }

        Reporter {
            aggregator: Aggregator::new(),
            collectors,
        }
    }
}

/// Owns the run's [Aggregator] and hands its final state to every configured collector.
pub struct Reporter {
    aggregator: Aggregator,
    collectors: Vec<Box<dyn ReportCollector + Send + Sync>>,
}

impl Reporter {
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Hand the summary to every collector. A failing collector is logged and does not prevent
    /// the others from running.
    pub fn finalize(&self, summary: &RunSummary) {
        for collector in &self.collectors {
            if let Err(e) = collector.finalize(summary) {
                log::warn!("Failed to report run summary: {e:?}");
            }
        }
    }
}
