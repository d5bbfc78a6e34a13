use crate::report::ReportCollector;
use stampede_summary_model::{append_run_summary, RunSummary};
use std::path::PathBuf;

/// Appends each run summary as one JSON line, so that a single file can collect many runs.
pub struct JsonReportCollector {
    path: PathBuf,
}

impl JsonReportCollector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReportCollector for JsonReportCollector {
    fn finalize(&self, summary: &RunSummary) -> anyhow::Result<()> {
        append_run_summary(summary, self.path.clone())?;
        log::info!("Run summary written to {}", self.path.display());
        Ok(())
    }
}
