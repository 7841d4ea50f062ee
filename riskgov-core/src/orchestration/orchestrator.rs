//! The orchestrator — validates a record, dispatches it to every registered
//! evaluator, aggregates the results, and keeps metrics and history.
//!
//! One `Orchestrator` can be wrapped in an `Arc` and run from many tasks at once.
//! Metrics, history, and the last-run status map live behind an internal lock that
//! is only held between await points.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{Instrument, Span, error, info, info_span, warn};
use uuid::Uuid;

use super::aggregator::{OrchestrationSummary, ResultAggregator};
use super::coordinator::ExecutionCoordinator;
use super::state::{RunLifecycle, RunState};
use crate::config::{GovernanceConfig, OrchestratorConfig};
use crate::error::{ConfigError, Result};
use crate::evaluators::{Evaluator, EvaluatorDescriptor, EvaluatorReport, default_evaluators};
use crate::health::{HealthReporter, HealthStatus};
use crate::metrics::{ExecutionHistoryEntry, MetricsTracker, PerformanceMetrics};
use crate::types::{AgentResults, EvaluatorStatus, ExecutionMode};
use crate::validator::InputValidator;

/// Run parameters echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionMetadata {
    pub execution_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Seconds from validation start until every evaluator has returned.
    pub execution_time: f64,
    pub mode: ExecutionMode,
    pub continue_on_error: bool,
    pub agent_count: usize,
}

/// Everything a successful run returns.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResponse {
    pub agent_results: AgentResults,
    pub orchestration_summary: OrchestrationSummary,
    pub execution_metadata: ExecutionMetadata,
}

#[derive(Debug)]
struct SharedState {
    tracker: MetricsTracker,
    /// Per-evaluator status from the most recent dispatch, declaration order.
    last_run: Vec<(String, EvaluatorStatus)>,
    last_state: RunState,
}

pub struct Orchestrator {
    evaluators: Vec<EvaluatorDescriptor>,
    config: OrchestratorConfig,
    validator: InputValidator,
    coordinator: ExecutionCoordinator,
    aggregator: ResultAggregator,
    shared: Mutex<SharedState>,
    span: Span,
}

impl Orchestrator {
    /// Build an orchestrator over `evaluators`, dispatched in the given order.
    ///
    /// Fails if the set is empty or two evaluators share a name.
    pub fn new(
        evaluators: Vec<Arc<dyn Evaluator>>,
        config: OrchestratorConfig,
    ) -> std::result::Result<Self, ConfigError> {
        if evaluators.is_empty() {
            return Err(ConfigError::NoEvaluators);
        }

        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(evaluators.len());
        for evaluator in evaluators {
            let descriptor = EvaluatorDescriptor::new(evaluator);
            if !seen.insert(descriptor.name.clone()) {
                return Err(ConfigError::DuplicateEvaluator {
                    name: descriptor.name,
                });
            }
            descriptors.push(descriptor);
        }

        for warning in config.validate() {
            warn!(warning = %warning, "Orchestrator configuration warning");
        }

        Ok(Self {
            coordinator: ExecutionCoordinator::new(config.max_workers),
            aggregator: ResultAggregator::new(config.latency_threshold_secs),
            shared: Mutex::new(SharedState {
                tracker: MetricsTracker::new(config.effective_history_capacity()),
                last_run: Vec::new(),
                last_state: RunState::Idle,
            }),
            evaluators: descriptors,
            validator: InputValidator::new(),
            config,
            span: Span::none(),
        })
    }

    /// Orchestrator over the reference evaluators, configured from `config`.
    pub fn from_config(config: &GovernanceConfig) -> std::result::Result<Self, ConfigError> {
        for warning in config.evaluators.validate() {
            warn!(warning = %warning, "Evaluator configuration warning");
        }
        Self::new(
            default_evaluators(&config.evaluators),
            config.orchestrator.clone(),
        )
    }

    /// Parent span for every run and evaluator call.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Replace the result aggregator, e.g. to add custom conflict rules.
    pub fn with_aggregator(mut self, aggregator: ResultAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Evaluator names in declaration order.
    pub fn evaluator_names(&self) -> Vec<&str> {
        self.evaluators.iter().map(|d| d.name.as_str()).collect()
    }

    /// Run with the configured mode and error policy.
    pub async fn run_with_defaults(&self, input: &Value) -> Result<OrchestrationResponse> {
        self.run(input, self.config.mode, self.config.continue_on_error)
            .await
    }

    /// Validate `input`, dispatch it to every evaluator, and aggregate the results.
    ///
    /// Validation failures and, with `continue_on_error = false`, evaluator failures
    /// are returned as errors after being recorded as failed runs.
    pub async fn run(
        &self,
        input: &Value,
        mode: ExecutionMode,
        continue_on_error: bool,
    ) -> Result<OrchestrationResponse> {
        let execution_id = Uuid::new_v4();
        let span = info_span!(
            parent: &self.span,
            "orchestration_run",
            %execution_id,
            %mode,
            continue_on_error
        );
        self.execute(input, mode, continue_on_error, execution_id)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        input: &Value,
        mode: ExecutionMode,
        continue_on_error: bool,
        execution_id: Uuid,
    ) -> Result<OrchestrationResponse> {
        let timestamp = Utc::now();
        let start = Instant::now();
        let mut lifecycle = RunLifecycle::new();

        lifecycle.advance(RunState::Validating)?;
        let request = match self.validator.validate(input) {
            Ok(request) => Arc::new(request),
            Err(err) => {
                lifecycle.advance(RunState::Failed)?;
                warn!(error = %err, "Input validation failed");
                self.record_failure(
                    execution_id,
                    timestamp,
                    input,
                    AgentResults::new(),
                    &err.to_string(),
                    false,
                );
                return Err(err.into());
            }
        };

        lifecycle.advance(RunState::Dispatching)?;
        info!(evaluators = self.evaluators.len(), "Dispatching evaluators");
        let mut outcome = match self
            .coordinator
            .run(&self.evaluators, request, mode, continue_on_error)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                lifecycle.advance(RunState::Failed)?;
                error!(error = %err, "Dispatch failed");
                self.record_failure(
                    execution_id,
                    timestamp,
                    input,
                    AgentResults::new(),
                    &err.to_string(),
                    false,
                );
                return Err(err);
            }
        };

        if let Some(err) = outcome.aborted.take() {
            lifecycle.advance(RunState::Failed)?;
            error!(
                evaluator = err.evaluator(),
                error = %err,
                path = ?lifecycle.path(),
                "Run aborted by evaluator failure"
            );
            self.record_failure(
                execution_id,
                timestamp,
                input,
                outcome.results,
                &err.to_string(),
                true,
            );
            return Err(err.into());
        }

        lifecycle.advance(RunState::Aggregating)?;
        let execution_time = start.elapsed().as_secs_f64();
        let summary = self
            .aggregator
            .summarize(&outcome.results, execution_time, execution_id);
        lifecycle.advance(RunState::Completed(summary.overall_status))?;

        if let Some((slowest, secs)) = outcome.slowest() {
            tracing::debug!(evaluator = slowest, elapsed_secs = secs, "Slowest evaluator");
        }
        info!(
            status = %summary.overall_status,
            successful = summary.successful_agents,
            failed = summary.failed_agents,
            elapsed_secs = execution_time,
            path = ?lifecycle.path(),
            "Run completed"
        );

        {
            let mut shared = self.shared();
            shared.tracker.record(execution_time, true);
            shared.tracker.push_history(ExecutionHistoryEntry {
                execution_id,
                timestamp,
                input: input.clone(),
                results: outcome.results.clone(),
                execution_time,
                success: true,
                error: None,
            });
            shared.last_run = summary.agent_status.clone();
            shared.last_state = lifecycle.state();
        }

        Ok(OrchestrationResponse {
            agent_results: outcome.results,
            orchestration_summary: summary,
            execution_metadata: ExecutionMetadata {
                execution_id,
                timestamp,
                execution_time,
                mode,
                continue_on_error,
                agent_count: self.evaluators.len(),
            },
        })
    }

    /// Record a run that ended in an error. Duration is recorded as 0.
    fn record_failure(
        &self,
        execution_id: Uuid,
        timestamp: DateTime<Utc>,
        input: &Value,
        results: AgentResults,
        error: &str,
        dispatched: bool,
    ) {
        let mut shared = self.shared();
        shared.tracker.record(0.0, false);
        if dispatched {
            shared.last_run = results
                .iter()
                .map(|(name, r)| {
                    let status = if r.is_failure() {
                        EvaluatorStatus::Failed
                    } else {
                        EvaluatorStatus::Healthy
                    };
                    (name.to_string(), status)
                })
                .collect();
        }
        shared.tracker.push_history(ExecutionHistoryEntry {
            execution_id,
            timestamp,
            input: input.clone(),
            results,
            execution_time: 0.0,
            success: false,
            error: Some(error.to_string()),
        });
        shared.last_state = RunState::Failed;
    }

    /// Orchestrator health, per-evaluator health, metrics, and the last run.
    pub fn health_status(&self) -> HealthStatus {
        let shared = self.shared();
        HealthReporter.status(&self.evaluators, &shared.last_run, &shared.tracker)
    }

    /// Each evaluator's cumulative report, in declaration order.
    pub fn agent_reports(&self) -> Vec<EvaluatorReport> {
        self.evaluators
            .iter()
            .map(|d| d.evaluator.report())
            .collect()
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.shared().tracker.snapshot()
    }

    /// Up to `n` most recent history entries, newest first.
    pub fn recent_executions(&self, n: usize) -> Vec<ExecutionHistoryEntry> {
        self.shared()
            .tracker
            .recent(n)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Look up a retained history entry by id.
    pub fn execution(&self, execution_id: &Uuid) -> Option<ExecutionHistoryEntry> {
        self.shared().tracker.history().get(execution_id).cloned()
    }

    /// Terminal state of the most recent run, `Idle` if none.
    pub fn last_run_state(&self) -> RunState {
        self.shared().last_state
    }

    /// Zero all counters, clear the history, and reset every evaluator.
    pub fn reset_metrics(&self) {
        let mut shared = self.shared();
        shared.tracker.reset();
        shared.last_run.clear();
        shared.last_state = RunState::Idle;
        for descriptor in &self.evaluators {
            descriptor.evaluator.reset();
        }
        info!("Metrics reset");
    }

    fn shared(&self) -> MutexGuard<'_, SharedState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("evaluators", &self.evaluator_names())
            .field("config", &self.config)
            .field("aggregator", &self.aggregator)
            .finish()
    }
}
