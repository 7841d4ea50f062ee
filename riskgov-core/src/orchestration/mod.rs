//! Orchestration engine — dispatch, aggregation, and run lifecycle.
//!
//! [`Orchestrator`] is the entry point. It drives each run through
//! [`RunState`], hands evaluators to the [`ExecutionCoordinator`], and builds the
//! summary with the [`ResultAggregator`].

pub mod aggregator;
pub mod coordinator;
pub mod orchestrator;
pub mod state;

pub use aggregator::{
    BiasApprovalRule, ComplianceApprovalRule, Conflict, ConflictRule, Insights,
    OrchestrationSummary, ResultAggregator, default_rules,
};
pub use coordinator::{DispatchOutcome, ExecutionCoordinator};
pub use orchestrator::{ExecutionMetadata, OrchestrationResponse, Orchestrator};
pub use state::{RunLifecycle, RunState};
