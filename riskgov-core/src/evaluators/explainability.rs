//! Explainability: a short narrative of which features drove the risk score.

use super::{Evaluator, EvaluatorStats};
use crate::error::EvaluatorError;
use crate::types::{EvaluationRequest, EvaluationResult};

pub struct ExplainabilityEvaluator {
    stats: EvaluatorStats,
}

impl ExplainabilityEvaluator {
    pub fn new(degraded_at: f64) -> Self {
        Self {
            stats: EvaluatorStats::with_threshold(degraded_at),
        }
    }
}

impl Default for ExplainabilityEvaluator {
    fn default() -> Self {
        Self::new(super::DEFAULT_HEALTH_ERROR_RATE)
    }
}

impl Evaluator for ExplainabilityEvaluator {
    fn name(&self) -> &str {
        "ExplainabilityAgent"
    }

    fn required_fields(&self) -> &[&'static str] {
        &["features"]
    }

    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        let explanation = format!(
            "Model used [{}] to derive risk score.",
            request.features.join(", ")
        );
        Ok(EvaluationResult::new()
            .with_explanation(explanation)
            .with_field("feature_count", request.features.len()))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}
