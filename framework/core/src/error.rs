use std::path::PathBuf;
use std::time::Duration;

/// An invalid run configuration or scenario definition.
///
/// These are always raised before any virtual user starts, and are the only errors that stop a
/// run from happening.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),
    #[error("duration must be greater than zero")]
    ZeroDuration,
    #[error("invalid duration `{value}`: {reason}")]
    InvalidDuration { value: String, reason: String },
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("unsupported HTTP method `{0}`")]
    InvalidMethod(String),
    #[error("minimum delay {min:?} is greater than maximum delay {max:?}")]
    PaceRangeInverted { min: Duration, max: Duration },
    #[error("pace step {step}: {reason}")]
    InvalidPace { step: usize, reason: String },
    #[error("request step {step}: `body` and `json` cannot both be set")]
    ConflictingBody { step: usize },
    #[error("step {step}: name must not be empty")]
    EmptyName { step: usize },
    #[error("unknown template variable `{name}` in `{template}`")]
    UnknownVariable { name: String, template: String },
    #[error("unterminated placeholder in template `{0}`")]
    UnterminatedPlaceholder(String),
    #[error("empty placeholder in template `{0}`")]
    EmptyPlaceholder(String),
    #[error("invalid variable override `{0}`, expected KEY=VALUE")]
    InvalidVariableOverride(String),
    #[error("scenario `{0}` has no steps")]
    EmptyScenario(String),
    #[error("failed to read scenario file {path:?}")]
    ReadScenario {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario file {path:?}: {reason}")]
    ParseScenario { path: PathBuf, reason: String },
    #[error("unsupported scenario file {0:?}, expected a .toml, .yaml or .yml file")]
    UnsupportedScenarioFormat(PathBuf),
}

/// The HTTP capability failed to produce a response.
///
/// This is recorded as a failed request, the virtual user carries on with the next step.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("transport error: {msg}")]
pub struct TransportError {
    msg: String,
}

impl TransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// A check predicate could not be evaluated, for example because the body was expected to be
/// JSON and was not. Counted as a failed check.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("check predicate failed to evaluate: {msg}")]
pub struct CheckPredicateError {
    msg: String,
}

impl CheckPredicateError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// A check ran before any response was received in the current iteration.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub struct NoResponseError {
    msg: String,
}

impl Default for NoResponseError {
    fn default() -> Self {
        Self {
            msg: "No response has been received in this iteration".to_string(),
        }
    }
}
