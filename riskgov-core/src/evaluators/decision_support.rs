//! Decision support: maps the caller's risk level onto an approval decision.

use super::{Evaluator, EvaluatorStats};
use crate::error::EvaluatorError;
use crate::types::{Decision, EvaluationRequest, EvaluationResult, RiskLevel};

pub struct DecisionSupportEvaluator {
    stats: EvaluatorStats,
}

impl DecisionSupportEvaluator {
    pub fn new(degraded_at: f64) -> Self {
        Self {
            stats: EvaluatorStats::with_threshold(degraded_at),
        }
    }
}

impl Default for DecisionSupportEvaluator {
    fn default() -> Self {
        Self::new(super::DEFAULT_HEALTH_ERROR_RATE)
    }
}

impl Evaluator for DecisionSupportEvaluator {
    fn name(&self) -> &str {
        "DecisionSupportAgent"
    }

    fn required_fields(&self) -> &[&'static str] {
        &["risk_level"]
    }

    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        let decision = match request.risk_level {
            RiskLevel::Low => Decision::Approve,
            RiskLevel::Medium => Decision::Review,
            RiskLevel::High => Decision::Reject,
        };
        Ok(EvaluationResult::new()
            .with_decision(decision)
            .with_field("risk_level", u8::from(request.risk_level)))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}
