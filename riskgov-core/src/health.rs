//! Read-only health view over an orchestrator's evaluators, metrics, and history.

use serde::Serialize;

use crate::evaluators::{EvaluatorDescriptor, EvaluatorReport};
use crate::metrics::{ExecutionHistoryEntry, MetricsTracker, PerformanceMetrics};
use crate::types::EvaluatorStatus;

/// Orchestrator-level health: degraded once any run has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorHealth {
    Healthy,
    Degraded,
}

impl std::fmt::Display for OrchestratorHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorHealth::Healthy => write!(f, "healthy"),
            OrchestratorHealth::Degraded => write!(f, "degraded"),
        }
    }
}

/// One evaluator's status in the most recent run merged with its own report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentHealth {
    /// `None` if the evaluator has not run since the last reset.
    pub last_status: Option<EvaluatorStatus>,
    #[serde(flatten)]
    pub report: EvaluatorReport,
}

/// Snapshot returned by `Orchestrator::health_status`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub orchestrator_status: OrchestratorHealth,
    #[serde(serialize_with = "crate::types::ordered_map")]
    pub agent_status: Vec<(String, AgentHealth)>,
    pub performance_metrics: PerformanceMetrics,
    pub last_execution: Option<ExecutionHistoryEntry>,
}

impl HealthStatus {
    pub fn agent(&self, name: &str) -> Option<&AgentHealth> {
        self.agent_status
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| h)
    }
}

/// Builds [`HealthStatus`] snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthReporter;

impl HealthReporter {
    pub fn status(
        &self,
        evaluators: &[EvaluatorDescriptor],
        last_run: &[(String, EvaluatorStatus)],
        tracker: &MetricsTracker,
    ) -> HealthStatus {
        let metrics = tracker.snapshot();
        let orchestrator_status = if metrics.failed_executions == 0 {
            OrchestratorHealth::Healthy
        } else {
            OrchestratorHealth::Degraded
        };

        let agent_status = evaluators
            .iter()
            .map(|descriptor| {
                let last_status = last_run
                    .iter()
                    .find(|(name, _)| *name == descriptor.name)
                    .map(|(_, status)| *status);
                let health = AgentHealth {
                    last_status,
                    report: descriptor.evaluator.report(),
                };
                (descriptor.name.clone(), health)
            })
            .collect();

        HealthStatus {
            orchestrator_status,
            agent_status,
            performance_metrics: metrics,
            last_execution: tracker.last().cloned(),
        }
    }
}
