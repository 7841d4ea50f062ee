//! Lifecycle of a single orchestration run.

use serde::Serialize;
use tracing::debug;

use crate::error::OrchestrationError;
use crate::types::OverallStatus;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "status", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Validating,
    Dispatching,
    Aggregating,
    Completed(OverallStatus),
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed(_) | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Validating => write!(f, "validating"),
            RunState::Dispatching => write!(f, "dispatching"),
            RunState::Aggregating => write!(f, "aggregating"),
            RunState::Completed(status) => write!(f, "completed({status})"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

fn is_valid_transition(from: RunState, to: RunState) -> bool {
    matches!(
        (from, to),
        (RunState::Idle, RunState::Validating)
            | (RunState::Validating, RunState::Dispatching)
            | (RunState::Validating, RunState::Failed)
            | (RunState::Dispatching, RunState::Aggregating)
            | (RunState::Dispatching, RunState::Failed)
            | (RunState::Aggregating, RunState::Completed(_))
            | (RunState::Aggregating, RunState::Failed)
    )
}

/// Tracks one run's state and the path it took.
#[derive(Debug, Clone)]
pub struct RunLifecycle {
    state: RunState,
    path: Vec<RunState>,
}

impl RunLifecycle {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            path: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn path(&self) -> &[RunState] {
        &self.path
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: RunState) -> Result<(), OrchestrationError> {
        if !is_valid_transition(self.state, next) {
            return Err(OrchestrationError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
        self.path.push(next);
        Ok(())
    }
}

impl Default for RunLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut run = RunLifecycle::new();
        run.advance(RunState::Validating).unwrap();
        run.advance(RunState::Dispatching).unwrap();
        run.advance(RunState::Aggregating).unwrap();
        run.advance(RunState::Completed(OverallStatus::PartialFailure))
            .unwrap();

        assert!(run.state().is_terminal());
        assert_eq!(run.path().len(), 5);
        assert_eq!(run.state().to_string(), "completed(partial_failure)");
    }

    #[test]
    fn test_validation_failure_skips_dispatch() {
        let mut run = RunLifecycle::new();
        run.advance(RunState::Validating).unwrap();
        run.advance(RunState::Failed).unwrap();
        assert_eq!(
            run.path(),
            &[RunState::Idle, RunState::Validating, RunState::Failed]
        );
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut run = RunLifecycle::new();
        let err = run.advance(RunState::Dispatching).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid run state transition: idle -> dispatching"
        );
        assert_eq!(run.state(), RunState::Idle);

        run.advance(RunState::Validating).unwrap();
        run.advance(RunState::Failed).unwrap();
        assert!(run.advance(RunState::Validating).is_err());
        assert!(
            run.advance(RunState::Completed(OverallStatus::Success))
                .is_err()
        );
    }

    #[test]
    fn test_state_serialization() {
        let value = serde_json::to_value(RunState::Completed(OverallStatus::Success)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"state": "completed", "status": "success"})
        );
        let value = serde_json::to_value(RunState::Idle).unwrap();
        assert_eq!(value, serde_json::json!({"state": "idle"}));
    }
}
