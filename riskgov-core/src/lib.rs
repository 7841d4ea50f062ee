//! # RiskGov Core
//!
//! Core library for the risk governance orchestrator.
//! Validates loan/credit risk records, fans them out to a set of independent
//! evaluators (compliance, bias audit, decision support, explainability), and
//! aggregates their outputs into a single governance summary with metrics,
//! bounded history, and health reporting.

pub mod config;
pub mod error;
pub mod evaluators;
pub mod health;
pub mod metrics;
pub mod orchestration;
pub mod types;
pub mod validator;

// Re-export commonly used types at the crate root.
pub use config::{EvaluatorSettings, GovernanceConfig, OrchestratorConfig, load_config};
pub use error::{ConfigError, EvaluatorError, OrchestrationError, Result, ValidationError};
pub use evaluators::{
    Evaluator, EvaluatorDescriptor, EvaluatorHealth, EvaluatorReport, EvaluatorStats,
    default_evaluators,
};
pub use health::{AgentHealth, HealthStatus, OrchestratorHealth};
pub use metrics::{ExecutionHistoryEntry, PerformanceMetrics};
pub use orchestration::{
    ConflictRule, ExecutionMetadata, OrchestrationResponse, OrchestrationSummary, Orchestrator,
    ResultAggregator, RunState,
};
pub use types::{
    AgentResults, Decision, EvaluationRequest, EvaluationResult, EvaluatorStatus, ExecutionMode,
    OverallStatus, RiskLevel,
};
pub use validator::InputValidator;
