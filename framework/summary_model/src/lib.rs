use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// Pass and fail counts for a single named check.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckCounts {
    pub passes: u64,
    pub fails: u64,
}

impl CheckCounts {
    /// The number of times the check was evaluated.
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// Fraction of evaluations that passed, in `[0, 1]`. A check that never ran has a pass rate of
    /// zero.
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

/// Latency distribution for all requests sharing a label.
///
/// Durations are in milliseconds and only cover requests that produced a response. Requests that
/// failed in the transport are counted in [LatencySummary::failures].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub failures: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// The aggregated result of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSnapshot {
    /// Check name to pass/fail counts
    pub checks: BTreeMap<String, CheckCounts>,
    /// Request label to latency distribution
    pub requests: BTreeMap<String, LatencySummary>,
    /// The number of complete scenario iterations across all virtual users
    pub iterations: u64,
    /// The number of virtual users that were started
    pub vus_started: u64,
    /// The number of virtual users that finished cleanly
    ///
    /// This is less than [RunSnapshot::vus_started] if a virtual user crashed.
    pub vus_completed: u64,
}

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in milliseconds
    pub run_duration_ms: u64,
    /// The number of virtual users configured
    pub concurrency: usize,
    /// The base URL requests were sent to
    pub base_url: String,
    /// Variable overrides set for the run
    pub env: HashMap<String, String>,
    /// The version of Stampede that was used for this run
    pub stampede_version: String,
    /// The aggregated results
    pub snapshot: RunSnapshot,
}

impl RunSummary {
    /// Create a new run summary with an empty snapshot
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        run_duration_ms: u64,
        concurrency: usize,
        base_url: String,
        stampede_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            run_duration_ms,
            concurrency,
            base_url,
            env: HashMap::with_capacity(0),
            stampede_version,
            snapshot: RunSnapshot::default(),
        }
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Set the final snapshot
    pub fn set_snapshot(&mut self, snapshot: RunSnapshot) {
        self.snapshot = snapshot;
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: PathBuf) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all("\n".as_bytes())?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: PathBuf) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary(run_id: &str) -> RunSummary {
        let mut summary = RunSummary::new(
            run_id.to_string(),
            "chat_summary".to_string(),
            1_700_000_000,
            120_000,
            30,
            "http://localhost:8080".to_string(),
            "0.1.0".to_string(),
        );
        summary.add_env("message".to_string(), "hello".to_string());

        let mut snapshot = RunSnapshot {
            iterations: 12,
            vus_started: 30,
            vus_completed: 30,
            ..Default::default()
        };
        snapshot.checks.insert(
            "chat status 2xx".to_string(),
            CheckCounts {
                passes: 10,
                fails: 2,
            },
        );
        snapshot.requests.insert(
            "chat".to_string(),
            LatencySummary {
                count: 12,
                min_ms: 1.5,
                max_ms: 20.0,
                ..Default::default()
            },
        );
        summary.set_snapshot(snapshot);

        summary
    }

    #[test]
    fn test_should_compute_pass_rate() {
        let counts = CheckCounts {
            passes: 3,
            fails: 1,
        };

        assert_eq!(4, counts.total());
        assert_eq!(0.75, counts.pass_rate());
        assert_eq!(0.0, CheckCounts::default().pass_rate());
    }

    #[test]
    fn test_should_append_and_load_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries.jsonl");

        append_run_summary(&sample_summary("first"), path.clone()).unwrap();
        append_run_summary(&sample_summary("second"), path.clone()).unwrap();

        let runs = load_summary_runs(path).unwrap();
        assert_eq!(2, runs.len());
        assert_eq!("first", runs[0].run_id);
        pretty_assertions::assert_eq!(sample_summary("second"), runs[1]);
    }

    #[test]
    fn test_should_load_single_summary() {
        let mut buf = Vec::new();
        store_run_summary(&sample_summary("single"), &mut buf).unwrap();

        let loaded = load_run_summary(buf.as_slice()).unwrap();
        assert_eq!(
            Some(&CheckCounts {
                passes: 10,
                fails: 2
            }),
            loaded.snapshot.checks.get("chat status 2xx")
        );
    }
}
