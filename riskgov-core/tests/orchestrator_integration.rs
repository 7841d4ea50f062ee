//! End-to-end tests for the orchestrator: validation gating, failure policies,
//! metrics, bounded history, and health reporting.

use pretty_assertions::assert_eq;
use riskgov_core::{
    Decision, EvaluationRequest, EvaluationResult, Evaluator, EvaluatorError, EvaluatorStats,
    ExecutionMode, GovernanceConfig, OrchestrationError, Orchestrator, OrchestratorConfig,
    OrchestratorHealth, OverallStatus, RunState, default_evaluators,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts calls and returns a fixed decision, or fails when told to.
struct SpyEvaluator {
    name: &'static str,
    decision: Decision,
    fail: bool,
    calls: AtomicUsize,
    stats: EvaluatorStats,
}

impl SpyEvaluator {
    fn approving(name: &'static str) -> Arc<Self> {
        Self::build(name, Decision::Approve, false)
    }

    fn deciding(name: &'static str, decision: Decision) -> Arc<Self> {
        Self::build(name, decision, false)
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Self::build(name, Decision::Reject, true)
    }

    fn build(name: &'static str, decision: Decision, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            decision,
            fail,
            calls: AtomicUsize::new(0),
            stats: EvaluatorStats::new(),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for SpyEvaluator {
    fn name(&self) -> &str {
        self.name
    }

    fn required_fields(&self) -> &[&'static str] {
        &["risk_score"]
    }

    fn evaluate(&self, _request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EvaluatorError::failed(self.name, "upstream model unavailable"));
        }
        Ok(EvaluationResult::new().with_decision(self.decision))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}

fn valid_input() -> Value {
    json!({
        "risk_score": 0.65,
        "bias_score": 0.25,
        "risk_level": 1,
        "features": ["income", "age", "credit_score"]
    })
}

fn orchestrator_over(evaluators: &[Arc<SpyEvaluator>]) -> Orchestrator {
    let evaluators: Vec<Arc<dyn Evaluator>> = evaluators
        .iter()
        .map(|e| Arc::clone(e) as Arc<dyn Evaluator>)
        .collect();
    Orchestrator::new(evaluators, OrchestratorConfig::default()).unwrap()
}

#[tokio::test]
async fn test_valid_input_with_continue_on_error_never_fails() {
    let a = SpyEvaluator::approving("A");
    let b = SpyEvaluator::failing("B");
    let c = SpyEvaluator::approving("C");
    let orchestrator = orchestrator_over(&[a, b, c]);

    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let response = orchestrator.run(&valid_input(), mode, true).await.unwrap();
        assert_eq!(response.agent_results.len(), 3);
        assert_eq!(
            response.orchestration_summary.overall_status,
            OverallStatus::PartialFailure
        );
    }
}

#[tokio::test]
async fn test_missing_features_invokes_nobody() {
    let spy = SpyEvaluator::approving("Spy");
    let orchestrator = orchestrator_over(&[spy.clone()]);

    let mut input = valid_input();
    input.as_object_mut().unwrap().remove("features");

    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let err = orchestrator.run(&input, mode, true).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Validation(_)));
        assert!(err.to_string().contains("features"));
    }
    assert_eq!(spy.calls(), 0);

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.failed_executions, 2);
    assert_eq!(orchestrator.last_run_state(), RunState::Failed);
}

#[tokio::test]
async fn test_fail_fast_stops_before_later_evaluators() {
    let a = SpyEvaluator::approving("A");
    let b = SpyEvaluator::failing("B");
    let c = SpyEvaluator::approving("C");
    let orchestrator = orchestrator_over(&[a.clone(), b.clone(), c.clone()]);

    let err = orchestrator
        .run(&valid_input(), ExecutionMode::Sequential, false)
        .await
        .unwrap_err();

    match &err {
        OrchestrationError::Evaluator(inner) => assert_eq!(inner.evaluator(), "B"),
        other => panic!("expected evaluator error, got {other:?}"),
    }
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 0);

    // The aborted run is on record with what had run so far.
    let last = orchestrator.recent_executions(1).remove(0);
    assert!(!last.success);
    assert_eq!(last.execution_time, 0.0);
    assert_eq!(last.results.names().collect::<Vec<_>>(), vec!["A", "B"]);
    assert!(last.error.unwrap().contains("upstream model unavailable"));

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.failed_executions, 1);
    assert_eq!(metrics.successful_executions, 0);
}

#[tokio::test]
async fn test_continue_on_error_runs_everyone() {
    let a = SpyEvaluator::approving("A");
    let b = SpyEvaluator::failing("B");
    let c = SpyEvaluator::deciding("C", Decision::Review);
    let orchestrator = orchestrator_over(&[a.clone(), b.clone(), c.clone()]);

    let response = orchestrator
        .run(&valid_input(), ExecutionMode::Sequential, true)
        .await
        .unwrap();

    assert_eq!(c.calls(), 1);
    let failed = response.agent_results.get("B").unwrap();
    assert!(failed.error.as_deref().unwrap().contains("upstream model unavailable"));
    assert_eq!(failed.execution_time, 0.0);
    assert_eq!(
        response.agent_results.get("C").unwrap().decision,
        Some(Decision::Review)
    );

    let summary = &response.orchestration_summary;
    assert_eq!(summary.successful_agents, 2);
    assert_eq!(summary.failed_agents, 1);
    assert!(
        summary
            .recommendations
            .contains(&"Investigate failures in B".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_fail_fast_still_fails_the_run() {
    let a = SpyEvaluator::approving("A");
    let b = SpyEvaluator::failing("B");
    let c = SpyEvaluator::approving("C");
    let orchestrator = orchestrator_over(&[a.clone(), b.clone(), c.clone()]);

    let err = orchestrator
        .run(&valid_input(), ExecutionMode::Concurrent, false)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::Evaluator(_)));
    // No early cancellation: siblings still ran.
    assert_eq!(a.calls() + c.calls(), 2);
}

#[tokio::test]
async fn test_consensus_and_primary_decision() {
    let orchestrator = orchestrator_over(&[
        SpyEvaluator::deciding("A", Decision::Approve),
        SpyEvaluator::deciding("B", Decision::Approve),
        SpyEvaluator::deciding("C", Decision::Reject),
    ]);

    let response = orchestrator
        .run(&valid_input(), ExecutionMode::Concurrent, true)
        .await
        .unwrap();
    let insights = &response.orchestration_summary.insights;
    assert_eq!(insights.decision_consensus, Some(false));
    assert_eq!(insights.primary_decision, Some(Decision::Approve));
    assert_eq!(
        response.orchestration_summary.recommendations,
        vec!["Review conflicting decisions"]
    );
}

#[tokio::test]
async fn test_history_keeps_latest_hundred() {
    let orchestrator = orchestrator_over(&[SpyEvaluator::approving("A")]);

    let mut ids = Vec::new();
    for _ in 0..101 {
        let response = orchestrator
            .run(&valid_input(), ExecutionMode::Sequential, true)
            .await
            .unwrap();
        ids.push(response.execution_metadata.execution_id);
    }

    let retained: Vec<_> = orchestrator
        .recent_executions(usize::MAX)
        .into_iter()
        .rev()
        .map(|e| e.execution_id)
        .collect();
    assert_eq!(retained.len(), 100);
    assert!(orchestrator.execution(&ids[0]).is_none());
    assert_eq!(retained, ids[1..].to_vec());
    assert_eq!(orchestrator.metrics().total_executions, 101);
}

#[tokio::test]
async fn test_configured_history_capacity() {
    let config = OrchestratorConfig {
        history_capacity: 3,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        vec![SpyEvaluator::approving("A") as Arc<dyn Evaluator>],
        config,
    )
    .unwrap();
    for _ in 0..5 {
        orchestrator.run_with_defaults(&valid_input()).await.unwrap();
    }
    assert_eq!(orchestrator.recent_executions(10).len(), 3);
}

#[tokio::test]
async fn test_average_counts_failures_as_zero() {
    let orchestrator = orchestrator_over(&[SpyEvaluator::approving("A")]);

    let mut times = Vec::new();
    for _ in 0..3 {
        let response = orchestrator
            .run(&valid_input(), ExecutionMode::Sequential, true)
            .await
            .unwrap();
        times.push(response.execution_metadata.execution_time);
    }
    orchestrator
        .run(&json!("not a record"), ExecutionMode::Sequential, true)
        .await
        .unwrap_err();
    times.push(0.0);

    let expected = times.iter().sum::<f64>() / times.len() as f64;
    let metrics = orchestrator.metrics();
    assert_eq!(metrics.total_executions, 4);
    assert!((metrics.average_execution_time - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_reset_clears_state_but_keeps_order() {
    let orchestrator = Orchestrator::from_config(&GovernanceConfig::default()).unwrap();
    let before: Vec<String> = orchestrator
        .evaluator_names()
        .into_iter()
        .map(String::from)
        .collect();

    orchestrator.run_with_defaults(&valid_input()).await.unwrap();
    orchestrator
        .run_with_defaults(&json!({}))
        .await
        .unwrap_err();
    assert_eq!(
        orchestrator.health_status().orchestrator_status,
        OrchestratorHealth::Degraded
    );

    orchestrator.reset_metrics();

    let health = orchestrator.health_status();
    assert_eq!(health.orchestrator_status, OrchestratorHealth::Healthy);
    assert_eq!(health.performance_metrics.total_executions, 0);
    assert!(health.last_execution.is_none());
    assert!(orchestrator.recent_executions(10).is_empty());
    assert!(
        orchestrator
            .agent_reports()
            .iter()
            .all(|r| r.execution_count == 0 && r.error_count == 0)
    );
    assert_eq!(orchestrator.evaluator_names(), before);
}

#[tokio::test]
async fn test_health_merges_last_run_and_reports() {
    let orchestrator = orchestrator_over(&[
        SpyEvaluator::approving("A"),
        SpyEvaluator::failing("B"),
    ]);
    orchestrator
        .run(&valid_input(), ExecutionMode::Concurrent, true)
        .await
        .unwrap();

    let health = orchestrator.health_status();
    // A partial failure is still a successful run.
    assert_eq!(health.orchestrator_status, OrchestratorHealth::Healthy);
    let b = health.agent("B").unwrap();
    assert_eq!(b.last_status, Some(riskgov_core::EvaluatorStatus::Failed));
    assert_eq!(b.report.error_count, 1);
    assert_eq!(b.report.status, riskgov_core::EvaluatorHealth::Degraded);
    assert!(health.last_execution.unwrap().success);
}

#[tokio::test]
async fn test_reference_evaluators_flag_conflicts() {
    let orchestrator = Orchestrator::new(
        default_evaluators(&Default::default()),
        OrchestratorConfig::default(),
    )
    .unwrap();

    // Non-compliant, biased, yet low risk level: decision support approves.
    let input = json!({
        "risk_score": 0.9,
        "bias_score": 0.5,
        "risk_level": 0,
        "features": ["income"],
        "applicant_id": "A-1042"
    });
    let response = orchestrator.run_with_defaults(&input).await.unwrap();
    let insights = &response.orchestration_summary.insights;

    let rules: Vec<&str> = insights.conflicts.iter().map(|c| c.rule.as_str()).collect();
    assert_eq!(rules, vec!["compliance_vs_approval", "bias_vs_approval"]);
    assert_eq!(insights.bias_flagged_by, vec!["BiasAuditingAgent"]);

    let entry = orchestrator
        .execution(&response.execution_metadata.execution_id)
        .unwrap();
    assert_eq!(entry.input["applicant_id"], json!("A-1042"));
}

/// Sleeps for a fixed time, then approves.
struct SlowEvaluator {
    name: String,
    delay: std::time::Duration,
    stats: EvaluatorStats,
}

impl Evaluator for SlowEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_fields(&self) -> &[&'static str] {
        &[]
    }

    fn evaluate(&self, _request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        std::thread::sleep(self.delay);
        Ok(EvaluationResult::new().with_decision(Decision::Approve))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}

fn slow_orchestrator(count: usize, delay: std::time::Duration, max_workers: Option<usize>) -> Orchestrator {
    let evaluators: Vec<Arc<dyn Evaluator>> = (0..count)
        .map(|i| {
            Arc::new(SlowEvaluator {
                name: format!("Slow{i}"),
                delay,
                stats: EvaluatorStats::new(),
            }) as Arc<dyn Evaluator>
        })
        .collect();
    let config = OrchestratorConfig {
        max_workers,
        ..OrchestratorConfig::default()
    };
    Orchestrator::new(evaluators, config).unwrap()
}

#[tokio::test]
async fn test_concurrent_mode_runs_evaluators_in_parallel() {
    let delay = std::time::Duration::from_millis(200);

    let parallel = slow_orchestrator(3, delay, None);
    let response = parallel
        .run(&valid_input(), ExecutionMode::Concurrent, true)
        .await
        .unwrap();
    let elapsed = response.execution_metadata.execution_time;
    assert!(elapsed >= 0.2 && elapsed < 0.4, "took {elapsed}s");

    let serial = slow_orchestrator(3, delay, Some(1));
    let response = serial
        .run(&valid_input(), ExecutionMode::Concurrent, true)
        .await
        .unwrap();
    let elapsed = response.execution_metadata.execution_time;
    assert!(elapsed >= 0.6, "took {elapsed}s");

    let sequential = slow_orchestrator(3, delay, None);
    let response = sequential
        .run(&valid_input(), ExecutionMode::Sequential, true)
        .await
        .unwrap();
    assert!(response.execution_metadata.execution_time >= 0.6);
}

/// Reports through extension fields only, including the well-known keys.
struct ExtensionOnlyEvaluator {
    name: &'static str,
    fields: Vec<(&'static str, Value)>,
    stats: EvaluatorStats,
}

impl Evaluator for ExtensionOnlyEvaluator {
    fn name(&self) -> &str {
        self.name
    }

    fn required_fields(&self) -> &[&'static str] {
        &[]
    }

    fn evaluate(&self, _request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        Ok(self
            .fields
            .iter()
            .fold(EvaluationResult::new(), |r, (k, v)| r.with_field(*k, v.clone())))
    }

    fn stats(&self) -> &EvaluatorStats {
        &self.stats
    }
}

#[tokio::test]
async fn test_well_known_extension_fields_drive_aggregation() {
    let evaluators: Vec<Arc<dyn Evaluator>> = vec![
        Arc::new(ExtensionOnlyEvaluator {
            name: "Auditor",
            fields: vec![("compliant", json!(false))],
            stats: EvaluatorStats::new(),
        }),
        Arc::new(ExtensionOnlyEvaluator {
            name: "Advisor",
            fields: vec![("decision", json!("Approve"))],
            stats: EvaluatorStats::new(),
        }),
        Arc::new(ExtensionOnlyEvaluator {
            name: "Flaky",
            fields: vec![("error", json!("model down"))],
            stats: EvaluatorStats::new(),
        }),
    ];
    let orchestrator = Orchestrator::new(evaluators, OrchestratorConfig::default()).unwrap();

    let response = orchestrator
        .run(&valid_input(), ExecutionMode::Sequential, true)
        .await
        .unwrap();
    let summary = &response.orchestration_summary;

    assert_eq!(summary.failed_agents, 1);
    assert_eq!(summary.overall_status, OverallStatus::PartialFailure);
    assert_eq!(summary.insights.primary_decision, Some(Decision::Approve));
    assert_eq!(summary.insights.conflicts.len(), 1);

    let rendered = serde_json::to_string(&response.agent_results).unwrap();
    assert_eq!(rendered.matches("\"execution_time\"").count(), 3);
    assert_eq!(rendered.matches("\"error\"").count(), 1);
}
