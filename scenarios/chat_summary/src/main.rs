use std::path::PathBuf;

use anyhow::Context;
use stampede_http_client::ReqwestHttpClient;
use stampede_runner::prelude::*;

const BUNDLED_SCENARIO: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/scenario.toml");

fn main() -> StampedeResult<()> {
    let cli = init();

    let scenario_path = cli
        .scenario
        .clone()
        .unwrap_or_else(|| PathBuf::from(BUNDLED_SCENARIO));
    log::info!("Loading scenario from {}", scenario_path.display());

    let definition = ScenarioDefinitionBuilder::from_file(&scenario_path)?.build()?;
    let config = RunConfig::from_cli(&cli, &definition);
    let client = ReqwestHttpClient::new(cli.request_timeout)
        .context("Failed to create HTTP client")?;

    let snapshot = run_with_options(definition, config, client, RunOptions::from_cli(&cli))?;

    if snapshot.vus_completed < snapshot.vus_started {
        log::warn!(
            "{} of {} virtual users did not complete",
            snapshot.vus_started - snapshot.vus_completed,
            snapshot.vus_started
        );
    }

    Ok(())
}
