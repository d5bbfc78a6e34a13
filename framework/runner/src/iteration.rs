use std::time::{Duration, Instant};

use stampede_core::prelude::HttpClient;
use stampede_instruments::{report_operation, OperationRecord};

use crate::check::evaluate;
use crate::context::{RunnerContext, VuContext};
use crate::definition::{RequestStep, Step};

/// Tallies for one pass through the scenario's steps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IterationResult {
    pub requests_sent: u64,
    pub requests_failed: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub elapsed: Duration,
}

/// Run every step of the scenario once, in order, for one virtual user.
///
/// Failed requests and failed checks are recorded and the iteration carries on. Iteration
/// completion itself is recorded by the caller.
pub fn run_iteration<C: HttpClient>(
    runner_context: &RunnerContext<C>,
    vu_context: &mut VuContext,
) -> IterationResult {
    let started = Instant::now();
    let mut result = IterationResult::default();
    let reporter = runner_context.reporter();
    let aggregator = reporter.aggregator();

    vu_context.begin_iteration();

    for step in &runner_context.scenario().steps {
        match step {
            Step::Request(request) => {
                result.requests_sent += 1;
                if !send_request(runner_context, vu_context, request) {
                    result.requests_failed += 1;
                }
            }
            Step::Check(check) => {
                let check_result =
                    evaluate(&check.name, &check.predicate, vu_context.last_response());
                if check_result.passed {
                    result.checks_passed += 1;
                } else {
                    result.checks_failed += 1;
                }
                aggregator.record_check(check_result);
            }
            Step::Pace(pace) => {
                let delay = pace.delay(vu_context.rng());
                log::trace!("{} pacing for {delay:?}", vu_context.vu_id());
                std::thread::sleep(delay);
            }
        }
    }

    vu_context.end_iteration();
    result.elapsed = started.elapsed();
    result
}

/// Returns whether a response was received.
fn send_request<C: HttpClient>(
    runner_context: &RunnerContext<C>,
    vu_context: &mut VuContext,
    request: &RequestStep,
) -> bool {
    let http_request = request.render(&runner_context.config().base_url, vu_context.variables());
    log::trace!(
        "{} sending {} {}",
        vu_context.vu_id(),
        http_request.method,
        http_request.url
    );

    let operation_record = OperationRecord::new(request.label.as_str());
    let response = runner_context
        .executor()
        .execute_in_place(runner_context.client().send(http_request));
    report_operation(
        runner_context.reporter().aggregator(),
        operation_record,
        &response,
    );

    match response {
        Ok(response) => {
            vu_context.set_last_response(Some(response));
            true
        }
        Err(e) => {
            log::warn!("Request `{}` failed: {}", request.label, e.message());
            vu_context.set_last_response(None);
            false
        }
    }
}
