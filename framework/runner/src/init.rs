use crate::cli::StampedeScenarioCli;
use clap::Parser;
use env_logger::Env;

/// Initialise the CLI and logging for the stampede runner.
///
/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init() -> StampedeScenarioCli {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    StampedeScenarioCli::parse()
}
