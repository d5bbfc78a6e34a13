use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Deserialize;
use stampede_core::prelude::{CheckPredicateError, HttpResponse, NoResponseError};
use stampede_instruments::CheckResult;

type CustomPredicateFn = dyn Fn(&HttpResponse) -> anyhow::Result<bool> + Send + Sync;

/// A predicate supplied as code rather than configuration.
#[derive(Clone)]
pub struct CustomPredicate(Arc<CustomPredicateFn>);

impl Debug for CustomPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomPredicate")
    }
}

/// A boolean assertion over a response.
///
/// In a scenario file a predicate is written as a single-key table, for example
/// `predicate = { status_range = { min = 200, max = 300 } }` or
/// `predicate = { status_in = [200, 201, 202, 302] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// The status code is one of the listed codes.
    StatusIn(Vec<u16>),
    /// `min <= status < max`
    StatusRange { min: u16, max: u16 },
    BodyContains(String),
    /// Header name matching ignores case, the value must match exactly.
    HeaderEquals { name: String, value: String },
    /// The body is JSON and has a value at the given JSON pointer, such as `/summary/text`.
    JsonPointerExists(String),
    /// The body is JSON and the value at the pointer equals the expected value.
    JsonPointerEquals {
        pointer: String,
        value: serde_json::Value,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    #[serde(skip)]
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn custom(
        predicate: impl Fn(&HttpResponse) -> anyhow::Result<bool> + Send + Sync + 'static,
    ) -> Self {
        Predicate::Custom(CustomPredicate(Arc::new(predicate)))
    }

    /// Success status codes in `[200, 300)`.
    pub fn status_2xx() -> Self {
        Predicate::StatusRange { min: 200, max: 300 }
    }

    pub fn test(&self, response: &HttpResponse) -> Result<bool, CheckPredicateError> {
        match self {
            Predicate::StatusIn(codes) => Ok(codes.contains(&response.status)),
            Predicate::StatusRange { min, max } => {
                Ok(*min <= response.status && response.status < *max)
            }
            Predicate::BodyContains(text) => Ok(response.body.contains(text.as_str())),
            Predicate::HeaderEquals { name, value } => {
                Ok(response.header(name) == Some(value.as_str()))
            }
            Predicate::JsonPointerExists(pointer) => {
                Ok(parse_json_body(response)?.pointer(pointer).is_some())
            }
            Predicate::JsonPointerEquals { pointer, value } => {
                Ok(parse_json_body(response)?.pointer(pointer) == Some(value))
            }
            Predicate::All(predicates) => {
                for predicate in predicates {
                    if !predicate.test(response)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(predicates) => {
                for predicate in predicates {
                    if predicate.test(response)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(predicate) => Ok(!predicate.test(response)?),
            Predicate::Custom(CustomPredicate(predicate)) => {
                predicate(response).map_err(|e| CheckPredicateError::new(format!("{e:#}")))
            }
        }
    }
}

fn parse_json_body(response: &HttpResponse) -> Result<serde_json::Value, CheckPredicateError> {
    response
        .json()
        .map_err(|e| CheckPredicateError::new(format!("response body is not JSON: {e}")))
}

/// Evaluate a named check against the most recent response.
///
/// A missing response, a predicate error or a panicking predicate all count as a failed check.
pub fn evaluate(name: &str, predicate: &Predicate, response: Option<&HttpResponse>) -> CheckResult {
    let Some(response) = response else {
        log::debug!("Check `{name}` failed: {}", NoResponseError::default());
        return CheckResult::new(name, false);
    };

    let passed = match catch_unwind(AssertUnwindSafe(|| predicate.test(response))) {
        Ok(Ok(passed)) => passed,
        Ok(Err(e)) => {
            log::debug!("Check `{name}` failed: {e}");
            false
        }
        Err(_) => {
            log::debug!("Check `{name}` failed: predicate panicked");
            false
        }
    };

    CheckResult::new(name, passed)
}
