//! Compliance check: a record is compliant while its risk score stays under a threshold.

use tracing::debug;

use super::{Evaluator, EvaluatorStats};
use crate::error::EvaluatorError;
use crate::types::{EvaluationRequest, EvaluationResult};

pub const DEFAULT_COMPLIANCE_THRESHOLD: f64 = 0.7;

pub struct ComplianceEvaluator {
    threshold: f64,
    stats: EvaluatorStats,
}

impl ComplianceEvaluator {
    pub fn new(threshold: f64, degraded_at: f64) -> Self {
        Self {
            threshold,
            stats: EvaluatorStats::with_threshold(degraded_at),
        }
    }
}

impl Default for ComplianceEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLIANCE_THRESHOLD, super::DEFAULT_HEALTH_ERROR_RATE)
    }
}

impl Evaluator for ComplianceEvaluator {
    fn name(&self) -> &str {
        "ComplianceAgent"
    }

    fn required_fields(&self) -> &[&'static str] {
        &["risk_score"]
    }

    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        let compliant = request.risk_score < self.threshold;
        debug!(risk_score = request.risk_score, compliant, "Compliance evaluated");
        Ok(EvaluationResult::new()
            .with_compliant(compliant)
            .with_field("risk_score", request.risk_score)
            .with_field("threshold", self.threshold))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}
