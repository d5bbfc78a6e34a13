mod check;
mod cli;
mod clock;
mod config;
mod context;
mod definition;
mod executor;
mod init;
mod iteration;
mod pacing;
mod progress;
mod run;
mod shutdown;
mod template;
mod types;

pub mod prelude {
    pub use crate::check::{evaluate, CustomPredicate, Predicate};
    pub use crate::cli::StampedeScenarioCli;
    pub use crate::clock::RunClock;
    pub use crate::config::{
        base_url_from_env, parse_duration, parse_var, RunConfig, DEFAULT_BASE_URL,
        DEFAULT_DURATION, DEFAULT_VUS, TARGET_URL_ENV,
    };
    pub use crate::context::{RunnerContext, VuContext};
    pub use crate::definition::{
        BodyTemplate, CheckStep, PaceStep, RequestDefinition, RequestStep, ScenarioDefinition,
        ScenarioDefinitionBuilder, Step,
    };
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::iteration::{run_iteration, IterationResult};
    pub use crate::pacing::{next_delay, validate_range};
    pub use crate::run::{run, run_with_options, run_with_shutdown, RunOptions};
    pub use crate::template::{JsonTemplate, Template, Variables};
    pub use crate::types::StampedeResult;

    pub use stampede_core::prelude::*;
    pub use stampede_instruments::ReportConfig;
    pub use stampede_summary_model::{CheckCounts, LatencySummary, RunSnapshot, RunSummary};
}
