//! Result aggregation — success accounting, decision consensus, conflict
//! detection, and recommendations for one run.

use serde::Serialize;
use uuid::Uuid;

use crate::config::DEFAULT_LATENCY_THRESHOLD_SECS;
use crate::types::{AgentResults, Decision, EvaluationResult, EvaluatorStatus, OverallStatus};

/// A disagreement between two evaluators detected by a [`ConflictRule`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub rule: String,
    /// The evaluator raising the concern.
    pub flagged_by: String,
    /// The evaluator whose decision contradicts it.
    pub contradicted_by: String,
    pub description: String,
}

/// A pairwise check over a run's successful results.
pub trait ConflictRule: Send + Sync {
    fn name(&self) -> &str;

    /// Return every conflict this rule finds. `results` holds successful slots only.
    fn detect(&self, results: &[(&str, &EvaluationResult)]) -> Vec<Conflict>;
}

/// Flags `compliant = false` in one evaluator against `decision = Approve` in another.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceApprovalRule;

impl ConflictRule for ComplianceApprovalRule {
    fn name(&self) -> &str {
        "compliance_vs_approval"
    }

    fn detect(&self, results: &[(&str, &EvaluationResult)]) -> Vec<Conflict> {
        flag_against_approval(
            self.name(),
            results,
            |r| r.compliant == Some(false),
            |flagged, approver| format!("{flagged} reports non-compliance but {approver} approves"),
        )
    }
}

/// Flags `bias_flagged = true` in one evaluator against `decision = Approve` in another.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasApprovalRule;

impl ConflictRule for BiasApprovalRule {
    fn name(&self) -> &str {
        "bias_vs_approval"
    }

    fn detect(&self, results: &[(&str, &EvaluationResult)]) -> Vec<Conflict> {
        flag_against_approval(
            self.name(),
            results,
            |r| r.bias_flagged == Some(true),
            |flagged, approver| format!("{flagged} flags bias but {approver} approves"),
        )
    }
}

fn flag_against_approval(
    rule: &str,
    results: &[(&str, &EvaluationResult)],
    concern: impl Fn(&EvaluationResult) -> bool,
    describe: impl Fn(&str, &str) -> String,
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for &(flagged, result) in results {
        if !concern(result) {
            continue;
        }
        for &(approver, other) in results {
            if approver == flagged || other.decision != Some(Decision::Approve) {
                continue;
            }
            conflicts.push(Conflict {
                rule: rule.to_string(),
                flagged_by: flagged.to_string(),
                contradicted_by: approver.to_string(),
                description: describe(flagged, approver),
            });
        }
    }
    conflicts
}

/// The built-in conflict rules.
pub fn default_rules() -> Vec<Box<dyn ConflictRule>> {
    vec![Box::new(ComplianceApprovalRule), Box::new(BiasApprovalRule)]
}

/// Cross-evaluator findings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    /// `None` when no evaluator produced a decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_consensus: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_decision: Option<Decision>,
    #[serde(serialize_with = "crate::types::ordered_map")]
    pub decisions: Vec<(String, Decision)>,
    pub conflicts: Vec<Conflict>,
    pub bias_flagged_by: Vec<String>,
}

/// Cross-evaluator view of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationSummary {
    pub execution_id: Uuid,
    pub total_agents: usize,
    pub successful_agents: usize,
    pub failed_agents: usize,
    pub success_rate: f64,
    pub total_execution_time: f64,
    #[serde(serialize_with = "crate::types::ordered_map")]
    pub agent_status: Vec<(String, EvaluatorStatus)>,
    pub insights: Insights,
    pub recommendations: Vec<String>,
    pub overall_status: OverallStatus,
}

impl OrchestrationSummary {
    /// `failed_agents / total_agents`, 0.0 for an empty run.
    pub fn failed_fraction(&self) -> f64 {
        if self.total_agents == 0 {
            0.0
        } else {
            self.failed_agents as f64 / self.total_agents as f64
        }
    }

    pub fn failed_agent_names(&self) -> impl Iterator<Item = &str> {
        self.agent_status
            .iter()
            .filter(|(_, s)| *s == EvaluatorStatus::Failed)
            .map(|(n, _)| n.as_str())
    }
}

/// Builds an [`OrchestrationSummary`] from a run's results.
pub struct ResultAggregator {
    latency_threshold_secs: f64,
    rules: Vec<Box<dyn ConflictRule>>,
}

impl ResultAggregator {
    pub fn new(latency_threshold_secs: f64) -> Self {
        Self {
            latency_threshold_secs,
            rules: default_rules(),
        }
    }

    /// Add a custom conflict rule after the built-in ones.
    pub fn with_rule(mut self, rule: Box<dyn ConflictRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn summarize(
        &self,
        results: &AgentResults,
        total_execution_time: f64,
        execution_id: Uuid,
    ) -> OrchestrationSummary {
        let total = results.len();
        let agent_status: Vec<(String, EvaluatorStatus)> = results
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

        let successful: Vec<(&str, &EvaluationResult)> =
            results.iter().filter(|(_, r)| !r.is_failure()).collect();
        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, r)| r.is_failure())
            .map(|(name, _)| name)
            .collect();

        let success_rate = if total == 0 {
            0.0
        } else {
            successful.len() as f64 / total as f64
        };

        let overall_status = if failed.is_empty() {
            OverallStatus::Success
        } else if successful.is_empty() {
            OverallStatus::Failure
        } else {
            OverallStatus::PartialFailure
        };

        let insights = self.insights(&successful);
        let recommendations = self.recommendations(&successful, &failed, &insights);

        OrchestrationSummary {
            execution_id,
            total_agents: total,
            successful_agents: successful.len(),
            failed_agents: failed.len(),
            success_rate,
            total_execution_time,
            agent_status,
            insights,
            recommendations,
            overall_status,
        }
    }

    fn insights(&self, successful: &[(&str, &EvaluationResult)]) -> Insights {
        let decisions: Vec<(String, Decision)> = successful
            .iter()
            .filter_map(|(name, r)| r.decision.map(|d| (name.to_string(), d)))
            .collect();

        let (decision_consensus, primary_decision) = match decisions.first() {
            None => (None, None),
            Some((_, first)) => {
                let consensus = decisions.iter().all(|(_, d)| d == first);
                (Some(consensus), primary_decision(&decisions))
            }
        };

        let conflicts = self
            .rules
            .iter()
            .flat_map(|rule| rule.detect(successful))
            .collect();

        let bias_flagged_by = successful
            .iter()
            .filter(|(_, r)| r.bias_flagged == Some(true))
            .map(|(name, _)| name.to_string())
            .collect();

        Insights {
            decision_consensus,
            primary_decision,
            decisions,
            conflicts,
            bias_flagged_by,
        }
    }

    fn recommendations(
        &self,
        successful: &[(&str, &EvaluationResult)],
        failed: &[&str],
        insights: &Insights,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if insights.decision_consensus == Some(false) {
            recommendations.push("Review conflicting decisions".to_string());
        }

        if !failed.is_empty() {
            recommendations.push(format!("Investigate failures in {}", failed.join(", ")));
        }

        let slow: Vec<&str> = successful
            .iter()
            .filter(|(_, r)| r.execution_time > self.latency_threshold_secs)
            .map(|(name, _)| *name)
            .collect();
        if !slow.is_empty() {
            recommendations.push(format!("Optimize performance for {}", slow.join(", ")));
        }

        recommendations
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_THRESHOLD_SECS)
    }
}

/// Most frequent decision; ties go to whichever appeared first.
fn primary_decision(decisions: &[(String, Decision)]) -> Option<Decision> {
    let mut tally: Vec<(Decision, usize)> = Vec::new();
    for (_, decision) in decisions {
        match tally.iter_mut().find(|(d, _)| d == decision) {
            Some((_, count)) => *count += 1,
            None => tally.push((*decision, 1)),
        }
    }

    tally
        .into_iter()
        .fold(None, |best: Option<(Decision, usize)>, (d, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((d, count)),
        })
        .map(|(d, _)| d)
}

impl std::fmt::Debug for ResultAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("latency_threshold_secs", &self.latency_threshold_secs)
            .field("rules", &self.rule_names())
            .finish()
    }
}
