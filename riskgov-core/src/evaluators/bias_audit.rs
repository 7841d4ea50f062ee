//! Bias audit: flags records whose bias score exceeds a threshold.

use tracing::debug;

use super::{Evaluator, EvaluatorStats};
use crate::error::EvaluatorError;
use crate::types::{EvaluationRequest, EvaluationResult};

pub const DEFAULT_BIAS_THRESHOLD: f64 = 0.3;

pub struct BiasAuditEvaluator {
    threshold: f64,
    stats: EvaluatorStats,
}

impl BiasAuditEvaluator {
    pub fn new(threshold: f64, degraded_at: f64) -> Self {
        Self {
            threshold,
            stats: EvaluatorStats::with_threshold(degraded_at),
        }
    }
}

impl Default for BiasAuditEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_BIAS_THRESHOLD, super::DEFAULT_HEALTH_ERROR_RATE)
    }
}

impl Evaluator for BiasAuditEvaluator {
    fn name(&self) -> &str {
        "BiasAuditingAgent"
    }

    fn required_fields(&self) -> &[&'static str] {
        &["bias_score"]
    }

    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        let flagged = request.bias_score > self.threshold;
        debug!(bias_score = request.bias_score, flagged, "Bias audit evaluated");
        Ok(EvaluationResult::new()
            .with_bias_flagged(flagged)
            .with_field("bias_score", request.bias_score)
            .with_field("threshold", self.threshold))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}
