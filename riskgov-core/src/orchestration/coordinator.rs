//! Execution coordinator — dispatches the evaluator set sequentially or across a
//! bounded pool of blocking workers, isolating each evaluator's failure.
//!
//! Evaluator calls are blocking, so concurrent mode runs each one on
//! `tokio::task::spawn_blocking`, gated by a semaphore sized to the worker limit.
//! Fan-in waits for every worker; a failure never cancels its siblings.
//!
//! Errors and panics inside an evaluator are both caught. With `continue_on_error`
//! they become a failed result slot; without it the run is marked aborted with the
//! first failure observed: the first in declaration order for sequential mode, the
//! first to complete for concurrent mode (not deterministic across runs).

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{Span, debug, info_span, warn};

use crate::error::{EvaluatorError, OrchestrationError};
use crate::evaluators::EvaluatorDescriptor;
use crate::types::{AgentResults, EvaluationRequest, EvaluationResult, ExecutionMode};

/// What one dispatch produced.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// One entry per evaluator that ran, in declaration order.
    pub results: AgentResults,
    /// Wall-clock seconds spent in each evaluator that ran, failures included.
    pub durations: Vec<(String, f64)>,
    /// Set when `continue_on_error` was off and an evaluator failed.
    pub aborted: Option<EvaluatorError>,
}

impl DispatchOutcome {
    /// Slowest evaluator of the run, if any ran.
    pub fn slowest(&self) -> Option<(&str, f64)> {
        self.durations
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, secs)| (name.as_str(), *secs))
    }
}

/// Runs a set of evaluators against one request.
///
/// Evaluator spans are opened as children of whatever span is current when
/// [`ExecutionCoordinator::run`] is polled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionCoordinator {
    max_workers: Option<usize>,
}

impl ExecutionCoordinator {
    /// `max_workers = None` gives every evaluator its own worker.
    pub fn new(max_workers: Option<usize>) -> Self {
        Self { max_workers }
    }

    /// Number of workers used for a set of `evaluator_count` evaluators.
    pub fn worker_count(&self, evaluator_count: usize) -> usize {
        self.max_workers
            .unwrap_or(evaluator_count)
            .min(evaluator_count)
            .max(1)
    }

    pub async fn run(
        &self,
        evaluators: &[EvaluatorDescriptor],
        request: Arc<EvaluationRequest>,
        mode: ExecutionMode,
        continue_on_error: bool,
    ) -> Result<DispatchOutcome, OrchestrationError> {
        let parent = Span::current();
        match mode {
            ExecutionMode::Sequential => Ok(self.run_sequential(
                evaluators,
                &request,
                continue_on_error,
                &parent,
            )),
            ExecutionMode::Concurrent => {
                self.run_concurrent(evaluators, request, continue_on_error, parent)
                    .await
            }
        }
    }

    fn run_sequential(
        &self,
        evaluators: &[EvaluatorDescriptor],
        request: &EvaluationRequest,
        continue_on_error: bool,
        parent: &Span,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome {
            results: AgentResults::with_capacity(evaluators.len()),
            durations: Vec::with_capacity(evaluators.len()),
            aborted: None,
        };

        for descriptor in evaluators {
            let (result, elapsed) = invoke_isolated(descriptor, request, parent);
            outcome.durations.push((descriptor.name.clone(), elapsed));
            match result {
                Ok(result) => outcome.results.insert(descriptor.name.clone(), result),
                Err(err) => {
                    outcome
                        .results
                        .insert(descriptor.name.clone(), EvaluationResult::failed(err.to_string()));
                    if !continue_on_error {
                        outcome.aborted = Some(err);
                        break;
                    }
                }
            }
        }

        outcome
    }

    async fn run_concurrent(
        &self,
        evaluators: &[EvaluatorDescriptor],
        request: Arc<EvaluationRequest>,
        continue_on_error: bool,
        parent: Span,
    ) -> Result<DispatchOutcome, OrchestrationError> {
        let workers = self.worker_count(evaluators.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        debug!(workers, evaluators = evaluators.len(), "Dispatching concurrently");

        let mut pending = FuturesUnordered::new();
        for (index, descriptor) in evaluators.iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| OrchestrationError::unexpected("evaluator worker pool closed", e))?;
            let descriptor = descriptor.clone();
            let request = Arc::clone(&request);
            let parent = parent.clone();
            let name = descriptor.name.clone();

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                invoke_isolated(&descriptor, &request, &parent)
            });
            pending.push(async move { (index, name, handle.await) });
        }

        // Wait-all fan-in; slots are filled back in declaration order afterwards.
        let mut slots: Vec<Option<(Result<EvaluationResult, EvaluatorError>, f64)>> =
            vec![None; evaluators.len()];
        let mut first_failure: Option<EvaluatorError> = None;

        while let Some((index, name, joined)) = pending.next().await {
            let (result, elapsed) = match joined {
                Ok(pair) => pair,
                Err(join_err) => {
                    let message = join_err.to_string();
                    let err = if join_err.is_panic() {
                        EvaluatorError::Panicked {
                            evaluator: name,
                            message,
                        }
                    } else {
                        EvaluatorError::failed(name, message)
                    };
                    (Err(err), 0.0)
                }
            };
            if let Err(err) = &result {
                first_failure.get_or_insert_with(|| err.clone());
            }
            slots[index] = Some((result, elapsed));
        }

        let mut outcome = DispatchOutcome {
            results: AgentResults::with_capacity(evaluators.len()),
            durations: Vec::with_capacity(evaluators.len()),
            aborted: None,
        };
        for (descriptor, slot) in evaluators.iter().zip(slots) {
            let Some((result, elapsed)) = slot else {
                continue;
            };
            outcome.durations.push((descriptor.name.clone(), elapsed));
            let result = result.unwrap_or_else(|err| EvaluationResult::failed(err.to_string()));
            outcome.results.insert(descriptor.name.clone(), result);
        }

        if !continue_on_error {
            outcome.aborted = first_failure;
        }
        Ok(outcome)
    }
}

/// Call one evaluator inside its own span, timing it and catching panics.
fn invoke_isolated(
    descriptor: &EvaluatorDescriptor,
    request: &EvaluationRequest,
    parent: &Span,
) -> (Result<EvaluationResult, EvaluatorError>, f64) {
    let span = info_span!(parent: parent, "evaluator", name = %descriptor.name);
    span.in_scope(|| {
        let start = Instant::now();
        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| descriptor.evaluator.invoke(request)));
        let elapsed = start.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(mut result)) => {
                result.normalize();
                result.execution_time = if result.is_failure() { 0.0 } else { elapsed };
                debug!(elapsed_secs = elapsed, "Evaluator completed");
                Ok(result)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Evaluator failed");
                Err(err)
            }
            Err(payload) => {
                descriptor.evaluator.stats().record_error();
                let err = EvaluatorError::Panicked {
                    evaluator: descriptor.name.clone(),
                    message: panic_message(payload.as_ref()),
                };
                warn!(error = %err, "Evaluator panicked");
                Err(err)
            }
        };
        (result, elapsed)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
