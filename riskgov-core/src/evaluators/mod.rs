//! Evaluator capability — the interface every scoring component implements.
//!
//! The orchestration engine depends only on the [`Evaluator`] trait. The four
//! reference evaluators in this module are ordinary implementations of it and are
//! registered by [`default_evaluators`].

pub mod bias_audit;
pub mod compliance;
pub mod decision_support;
pub mod explainability;

pub use bias_audit::BiasAuditEvaluator;
pub use compliance::ComplianceEvaluator;
pub use decision_support::DecisionSupportEvaluator;
pub use explainability::ExplainabilityEvaluator;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EvaluatorSettings;
use crate::error::EvaluatorError;
use crate::types::{EvaluationRequest, EvaluationResult};

/// Error rate at or above which an evaluator reports itself degraded.
pub const DEFAULT_HEALTH_ERROR_RATE: f64 = 0.1;

/// A scoring component the orchestrator can dispatch.
///
/// Implementations are called from blocking worker threads, so they must be
/// `Send + Sync` and may block freely.
pub trait Evaluator: Send + Sync {
    /// Unique name used as the key in result maps.
    fn name(&self) -> &str;

    /// Input fields this evaluator reads, in the order it checks them.
    fn required_fields(&self) -> &[&'static str];

    /// Produce a result for one request.
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError>;

    /// Cumulative counters backing [`Evaluator::report`].
    fn stats(&self) -> &EvaluatorStats;

    /// Cumulative health report.
    fn report(&self) -> EvaluatorReport {
        self.stats().report(self.name())
    }

    /// Zero the cumulative counters.
    fn reset(&self) {
        self.stats().reset();
    }

    /// Check required fields, evaluate, and update the cumulative counters.
    ///
    /// This is what the coordinator calls; implementors override `evaluate`.
    fn invoke(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        let outcome = check_required_fields(self.name(), self.required_fields(), request)
            .and_then(|()| self.evaluate(request));
        match &outcome {
            Ok(_) => self.stats().record_success(),
            Err(_) => self.stats().record_error(),
        }
        outcome
    }
}

/// Fail with [`EvaluatorError::MissingField`] for the first absent field.
pub fn check_required_fields(
    evaluator: &str,
    fields: &[&'static str],
    request: &EvaluationRequest,
) -> Result<(), EvaluatorError> {
    match fields.iter().find(|f| !request.has_field(f)) {
        Some(missing) => Err(EvaluatorError::MissingField {
            evaluator: evaluator.to_string(),
            field: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Health classification derived from an evaluator's error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorHealth {
    Healthy,
    Degraded,
}

impl std::fmt::Display for EvaluatorHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorHealth::Healthy => write!(f, "healthy"),
            EvaluatorHealth::Degraded => write!(f, "degraded"),
        }
    }
}

/// Snapshot of an evaluator's cumulative counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorReport {
    pub agent: String,
    pub execution_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub status: EvaluatorHealth,
}

/// Thread-safe cumulative counters shared by an evaluator's calls.
#[derive(Debug)]
pub struct EvaluatorStats {
    execution_count: AtomicU64,
    error_count: AtomicU64,
    degraded_at: f64,
}

impl EvaluatorStats {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_HEALTH_ERROR_RATE)
    }

    /// Counters that report `degraded` once the error rate reaches `degraded_at`.
    pub fn with_threshold(degraded_at: f64) -> Self {
        Self {
            execution_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            degraded_at,
        }
    }

    pub fn record_success(&self) {
        self.execution_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.execution_count.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// `error_count / max(execution_count, 1)`.
    pub fn error_rate(&self) -> f64 {
        self.error_count() as f64 / self.execution_count().max(1) as f64
    }

    pub fn health(&self) -> EvaluatorHealth {
        if self.error_rate() < self.degraded_at {
            EvaluatorHealth::Healthy
        } else {
            EvaluatorHealth::Degraded
        }
    }

    pub fn report(&self, name: &str) -> EvaluatorReport {
        EvaluatorReport {
            agent: name.to_string(),
            execution_count: self.execution_count(),
            error_count: self.error_count(),
            error_rate: self.error_rate(),
            status: self.health(),
        }
    }

    pub fn reset(&self) {
        self.execution_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
    }
}

impl Default for EvaluatorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered evaluator: its unique name plus a shared handle to the capability.
#[derive(Clone)]
pub struct EvaluatorDescriptor {
    pub name: String,
    pub evaluator: Arc<dyn Evaluator>,
}

impl EvaluatorDescriptor {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            name: evaluator.name().to_string(),
            evaluator,
        }
    }
}

impl std::fmt::Debug for EvaluatorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorDescriptor")
            .field("name", &self.name)
            .field("required_fields", &self.evaluator.required_fields())
            .finish()
    }
}

/// The reference evaluator set, in its canonical declaration order.
pub fn default_evaluators(settings: &EvaluatorSettings) -> Vec<Arc<dyn Evaluator>> {
    vec![
        Arc::new(ComplianceEvaluator::new(
            settings.compliance_threshold,
            settings.health_error_rate,
        )),
        Arc::new(BiasAuditEvaluator::new(
            settings.bias_threshold,
            settings.health_error_rate,
        )),
        Arc::new(DecisionSupportEvaluator::new(settings.health_error_rate)),
        Arc::new(ExplainabilityEvaluator::new(settings.health_error_rate)),
    ]
}
