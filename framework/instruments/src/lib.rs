mod aggregator;
mod report;

pub use aggregator::{Aggregator, CheckResult};
pub use report::{
    JsonReportCollector, ReportCollector, ReportConfig, Reporter, SummaryReportCollector,
};

use std::time::{Duration, Instant};

/// Times a single request so that it can be reported against its label.
pub struct OperationRecord {
    label: String,
    started: Instant,
}

impl OperationRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Record the outcome of an operation. A successful operation contributes its latency, a failed
/// one is counted as a request failure under the same label.
pub fn report_operation<T, E>(
    aggregator: &Aggregator,
    operation_record: OperationRecord,
    response: &Result<T, E>,
) {
    let elapsed = operation_record.elapsed();
    match response {
        Ok(_) => aggregator.record_latency(&operation_record.label, elapsed),
        Err(_) => aggregator.record_request_failure(&operation_record.label),
    }
}
