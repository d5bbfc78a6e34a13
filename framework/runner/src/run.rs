use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use stampede_core::prelude::{HttpClient, ShutdownHandle};
use stampede_instruments::ReportConfig;
use stampede_summary_model::{RunSnapshot, RunSummary};

use crate::cli::StampedeScenarioCli;
use crate::clock::RunClock;
use crate::config::RunConfig;
use crate::context::{RunnerContext, VuContext};
use crate::definition::ScenarioDefinition;
use crate::executor::Executor;
use crate::iteration::run_iteration;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

/// Controls how a run is stopped and reported.
#[derive(Debug, Clone)]
pub struct RunOptions {
    shutdown_handle: Option<ShutdownHandle>,
    report_config: ReportConfig,
    show_progress: bool,
}

impl Default for RunOptions {
    /// Print the summary tables, without a progress bar.
    fn default() -> Self {
        Self {
            shutdown_handle: None,
            report_config: ReportConfig::default().enable_summary(),
            show_progress: false,
        }
    }
}

impl RunOptions {
    pub fn from_cli(cli: &StampedeScenarioCli) -> Self {
        let mut report_config = ReportConfig::default();
        if !cli.no_summary {
            report_config = report_config.enable_summary();
        }
        if let Some(path) = &cli.summary_file {
            report_config = report_config.enable_json_file(path.clone());
        }

        Self {
            shutdown_handle: None,
            report_config,
            show_progress: !cli.no_progress,
        }
    }

    /// Stop the run early through this handle, in addition to Ctrl-C and the deadline.
    ///
    /// The run only listens to this handle. It is left as it was when the run ends, so it can be
    /// used for another run.
    pub fn with_shutdown_handle(mut self, shutdown_handle: ShutdownHandle) -> Self {
        self.shutdown_handle = Some(shutdown_handle);
        self
    }

    pub fn with_report_config(mut self, report_config: ReportConfig) -> Self {
        self.report_config = report_config;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Run the scenario until the configured duration has elapsed or Ctrl-C is pressed.
pub fn run<C: HttpClient>(
    definition: ScenarioDefinition,
    config: RunConfig,
    client: C,
) -> anyhow::Result<RunSnapshot> {
    run_with_options(definition, config, client, RunOptions::default())
}

/// Like [run], but the run also stops when `shutdown_handle` is triggered.
pub fn run_with_shutdown<C: HttpClient>(
    definition: ScenarioDefinition,
    config: RunConfig,
    client: C,
    shutdown_handle: ShutdownHandle,
) -> anyhow::Result<RunSnapshot> {
    run_with_options(
        definition,
        config,
        client,
        RunOptions::default().with_shutdown_handle(shutdown_handle),
    )
}

pub fn run_with_options<C: HttpClient>(
    definition: ScenarioDefinition,
    config: RunConfig,
    client: C,
    options: RunOptions,
) -> anyhow::Result<RunSnapshot> {
    config.validate()?;
    definition.validate_variables(&config.env)?;

    log::info!(
        "Running scenario: {} with {} virtual users for {:?} against {}",
        definition.name,
        config.concurrency,
        config.duration,
        config.base_url
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    // Stopping the run must not leave the caller's handle stopped, so the run gets its own.
    let shutdown_handle = ShutdownHandle::new();
    start_shutdown_listener(
        &runtime,
        shutdown_handle.clone(),
        options
            .shutdown_handle
            .as_ref()
            .map(ShutdownHandle::new_listener),
    );

    let executor = Arc::new(Executor::new(runtime));
    let reporter = Arc::new(options.report_config.init());
    let started_at = chrono::Utc::now().timestamp();
    let clock = RunClock::start(config.duration);

    let progress_handle = if options.show_progress {
        match start_progress(clock.planned_runtime(), shutdown_handle.new_listener()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Failed to start progress thread: {e}");
                None
            }
        }
    } else {
        None
    };

    let runner_context = Arc::new(RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle,
        Arc::new(definition),
        config,
        Arc::new(client),
        clock,
    ));

    let spawn_result = spawn_vus(&runner_context);
    let handles = match spawn_result {
        Ok(handles) => handles,
        Err((handles, e)) => {
            runner_context.force_stop_scenario();
            join_vus(handles);
            stop_progress(progress_handle);
            return Err(e);
        }
    };

    join_vus(handles);
    // The progress bar runs until it sees the run's shutdown signal.
    runner_context.force_stop_scenario();
    stop_progress(progress_handle);

    let snapshot = reporter.aggregator().snapshot();
    log::info!(
        "Finished scenario: {} after {:?}, {} iterations completed",
        runner_context.scenario().name,
        runner_context.clock().elapsed(),
        snapshot.iterations
    );

    let config = runner_context.config();
    let mut summary = RunSummary::new(
        nanoid::nanoid!(),
        runner_context.scenario().name.clone(),
        started_at,
        u64::try_from(config.duration.as_millis()).unwrap_or(u64::MAX),
        config.concurrency,
        config.base_url.clone(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    for (key, value) in &config.env {
        summary.add_env(key.clone(), value.clone());
    }
    summary.set_snapshot(snapshot.clone());
    reporter.finalize(&summary);

    Ok(snapshot)
}

type SpawnError = (Vec<JoinHandle<()>>, anyhow::Error);

fn spawn_vus<C: HttpClient>(
    runner_context: &Arc<RunnerContext<C>>,
) -> Result<Vec<JoinHandle<()>>, SpawnError> {
    let mut handles = Vec::with_capacity(runner_context.config().concurrency);

    for vu_index in 0..runner_context.config().concurrency {
        let runner_context = runner_context.clone();
        let vu_id = format!("vu-{vu_index}");

        let spawned = std::thread::Builder::new()
            .name(vu_id.clone())
            .spawn(move || run_vu(runner_context, vu_index));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                let e = anyhow::Error::new(e).context(format!("Failed to spawn thread for {vu_id}"));
                return Err((handles, e));
            }
        }
    }

    Ok(handles)
}

fn run_vu<C: HttpClient>(runner_context: Arc<RunnerContext<C>>, vu_index: usize) {
    let reporter = runner_context.reporter();
    let aggregator = reporter.aggregator();
    let mut vu_context = VuContext::new(vu_index, runner_context.shared_variables());

    aggregator.record_vu_started();
    log::debug!("Starting {}", vu_context.vu_id());

    // Every virtual user runs at least one full iteration, the deadline and stop signal are only
    // checked once an iteration has finished.
    loop {
        let result = run_iteration(&runner_context, &mut vu_context);
        aggregator.record_iteration_complete();
        log::trace!(
            "{} completed iteration {} in {:?}: {:?}",
            vu_context.vu_id(),
            vu_context.iteration() - 1,
            result.elapsed,
            result
        );

        if runner_context.should_stop() {
            log::debug!("Stopping {}", vu_context.vu_id());
            break;
        }
    }

    aggregator.record_vu_completed();
}

fn join_vus(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("vu").to_string();
        if let Err(e) = handle.join() {
            log::error!("Virtual user {name} panicked: {e:?}");
        }
    }
}

fn stop_progress(progress_handle: Option<JoinHandle<()>>) {
    if let Some(handle) = progress_handle {
        if handle.join().is_err() {
            log::warn!("Progress thread panicked");
        }
    }
}
