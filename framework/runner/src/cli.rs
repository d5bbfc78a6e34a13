use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{parse_duration, parse_var};

#[derive(Parser, Debug, Clone, Default)]
#[command(about, long_about = None)]
pub struct StampedeScenarioCli {
    /// Path to a scenario file, in TOML or YAML format.
    ///
    /// Defaults to the scenario that ships with the binary.
    #[clap(long)]
    pub scenario: Option<PathBuf>,

    /// The number of virtual users to run.
    ///
    /// Defaults to the scenario's `vus`, or 30 if the scenario doesn't set one.
    #[clap(long)]
    pub vus: Option<usize>,

    /// How long to run the scenario for, such as `2m`, `90s` or a plain number of seconds.
    ///
    /// Virtual users stop starting new iterations once this has elapsed. Iterations that are
    /// already running are allowed to finish.
    #[clap(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// The base URL that scenario paths are resolved against.
    ///
    /// Falls back to the `TARGET_URL` environment variable, then `http://localhost:8080`.
    #[clap(long)]
    pub target_url: Option<String>,

    /// Override a scenario variable in the format `KEY=VALUE`. For example `--var message=hello`.
    ///
    /// You can override multiple variables by using the flag multiple times.
    #[clap(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Give up on a request that takes longer than this. No timeout by default.
    #[clap(long, value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Append the run summary as a JSON line to this file.
    #[clap(long)]
    pub summary_file: Option<PathBuf>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Do not print the summary tables at the end of the run.
    #[clap(long, default_value = "false")]
    pub no_summary: bool,
}
