use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stampede_core::prelude::{HttpClient, HttpResponse, ShutdownHandle};
use stampede_instruments::Reporter;

use crate::clock::RunClock;
use crate::config::RunConfig;
use crate::definition::ScenarioDefinition;
use crate::executor::Executor;
use crate::template::{Variables, BASE_URL_VAR, ITERATION_VAR, VU_VAR};

/// State shared, read only, by every virtual user in a run.
pub struct RunnerContext<C: HttpClient> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    scenario: Arc<ScenarioDefinition>,
    config: RunConfig,
    client: Arc<C>,
    clock: RunClock,
    variables: Arc<HashMap<String, String>>,
}

impl<C: HttpClient> RunnerContext<C> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        scenario: Arc<ScenarioDefinition>,
        config: RunConfig,
        client: Arc<C>,
        clock: RunClock,
    ) -> Self {
        // Run overrides win over the scenario's defaults. The base URL is fixed for the run.
        let mut variables = scenario.vars.clone();
        variables.extend(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables.insert(BASE_URL_VAR.to_string(), config.base_url.clone());

        Self {
            executor,
            reporter,
            shutdown_handle,
            scenario,
            config,
            client,
            clock,
            variables: Arc::new(variables),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn scenario(&self) -> &ScenarioDefinition {
        &self.scenario
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    /// Stop the run. Virtual users finish the iteration they are on and then exit.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    /// True once the deadline has passed or a stop has been requested.
    pub fn should_stop(&self) -> bool {
        self.clock.is_expired() || self.shutdown_handle.is_shutdown()
    }

    pub(crate) fn shared_variables(&self) -> Arc<HashMap<String, String>> {
        self.variables.clone()
    }
}

/// The private state of one virtual user.
pub struct VuContext {
    vu_index: usize,
    vu_id: String,
    iteration: u64,
    last_response: Option<HttpResponse>,
    rng: StdRng,
    variables: Variables,
}

impl VuContext {
    pub fn new(vu_index: usize, shared_variables: Arc<HashMap<String, String>>) -> Self {
        let mut variables = Variables::new(shared_variables);
        variables.set(VU_VAR, vu_index.to_string());

        Self {
            vu_index,
            vu_id: format!("vu-{vu_index}"),
            iteration: 0,
            last_response: None,
            rng: StdRng::from_entropy(),
            variables,
        }
    }

    pub fn vu_index(&self) -> usize {
        self.vu_index
    }

    pub fn vu_id(&self) -> &str {
        &self.vu_id
    }

    /// The number of the iteration that is running, or will run next. Starts at 0.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub(crate) fn begin_iteration(&mut self) {
        self.last_response = None;
        self.variables
            .set(ITERATION_VAR, self.iteration.to_string());
    }

    pub(crate) fn end_iteration(&mut self) {
        self.iteration += 1;
    }

    pub(crate) fn set_last_response(&mut self, response: Option<HttpResponse>) {
        self.last_response = response;
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
