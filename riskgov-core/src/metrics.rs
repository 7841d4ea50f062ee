//! Orchestrator metrics — cumulative run counters, running-average latency, and a
//! bounded history of past runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::types::AgentResults;

/// Cumulative statistics across all runs of one orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    /// Mean of every recorded execution time in seconds, failed runs counted as 0.
    pub average_execution_time: f64,
}

impl PerformanceMetrics {
    /// Record one run.
    ///
    /// The average is updated incrementally as `(old * (n - 1) + time) / n` where `n`
    /// is the post-increment run count. Failed runs are recorded with a time of 0 and
    /// still count towards `n`, which pulls the average down.
    pub fn record(&mut self, execution_time: f64, success: bool) {
        self.total_executions += 1;
        if success {
            self.successful_executions += 1;
        } else {
            self.failed_executions += 1;
        }

        let n = self.total_executions as f64;
        self.average_execution_time =
            (self.average_execution_time * (n - 1.0) + execution_time) / n;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Audit record of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionHistoryEntry {
    pub execution_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// The input as supplied by the caller, valid or not.
    pub input: Value,
    pub results: AgentResults,
    /// Run duration in seconds. Zero for runs that failed before completing.
    pub execution_time: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded FIFO of past runs. The oldest entry is evicted once capacity is reached.
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    entries: VecDeque<ExecutionHistoryEntry>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ExecutionHistoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Most recent entry.
    pub fn last(&self) -> Option<&ExecutionHistoryEntry> {
        self.entries.back()
    }

    /// Most recent `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&ExecutionHistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    /// All retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionHistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, execution_id: &Uuid) -> Option<&ExecutionHistoryEntry> {
        self.entries.iter().find(|e| &e.execution_id == execution_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Cumulative metrics plus the bounded run history.
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    metrics: PerformanceMetrics,
    history: ExecutionHistory,
}

impl MetricsTracker {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            metrics: PerformanceMetrics::default(),
            history: ExecutionHistory::new(history_capacity),
        }
    }

    /// Record one run's duration and outcome.
    pub fn record(&mut self, execution_time: f64, success: bool) {
        self.metrics.record(execution_time, success);
    }

    /// Append an audit entry for a finished run.
    pub fn push_history(&mut self, entry: ExecutionHistoryEntry) {
        self.history.push(entry);
    }

    /// Zero every counter and clear the history.
    pub fn reset(&mut self) {
        self.metrics.reset();
        self.history.clear();
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Immutable copy of the current counters.
    pub fn snapshot(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }

    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    pub fn last(&self) -> Option<&ExecutionHistoryEntry> {
        self.history.last()
    }

    pub fn recent(&self, n: usize) -> Vec<&ExecutionHistoryEntry> {
        self.history.recent(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(i: usize) -> ExecutionHistoryEntry {
        ExecutionHistoryEntry {
            execution_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input: json!({ "run": i }),
            results: AgentResults::new(),
            execution_time: i as f64,
            success: true,
            error: None,
        }
    }

    #[test]
    fn test_metrics_default() {
        let m = PerformanceMetrics::default();
        assert_eq!(m.total_executions, 0);
        assert_eq!(m.successful_executions, 0);
        assert_eq!(m.failed_executions, 0);
        assert_eq!(m.average_execution_time, 0.0);
    }

    #[test]
    fn test_running_average_includes_failed_runs_as_zero() {
        let mut m = PerformanceMetrics::default();
        m.record(2.0, true);
        m.record(4.0, true);
        m.record(0.0, false);

        assert_eq!(m.total_executions, 3);
        assert_eq!(m.successful_executions, 2);
        assert_eq!(m.failed_executions, 1);
        assert!((m.average_execution_time - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = ExecutionHistory::new(3);
        let ids: Vec<Uuid> = (0..5)
            .map(|i| {
                let e = entry(i);
                let id = e.execution_id;
                history.push(e);
                id
            })
            .collect();

        assert_eq!(history.len(), 3);
        assert!(history.get(&ids[0]).is_none());
        assert!(history.get(&ids[1]).is_none());
        let retained: Vec<Uuid> = history.iter().map(|e| e.execution_id).collect();
        assert_eq!(retained, ids[2..].to_vec());
        assert_eq!(history.last().unwrap().execution_id, ids[4]);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut tracker = MetricsTracker::new(10);
        for i in 0..4 {
            tracker.push_history(entry(i));
        }
        let recent = tracker.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].input, json!({ "run": 3 }));
        assert_eq!(recent[1].input, json!({ "run": 2 }));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = ExecutionHistory::new(0);
        history.push(entry(0));
        history.push(entry(1));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_tracker_reset() {
        let mut tracker = MetricsTracker::default();
        tracker.record(1.5, true);
        tracker.record(0.0, false);
        tracker.push_history(entry(0));

        tracker.reset();
        assert_eq!(tracker.snapshot(), PerformanceMetrics::default());
        assert!(tracker.history().is_empty());
        assert!(tracker.last().is_none());
        assert_eq!(tracker.history().capacity(), DEFAULT_HISTORY_CAPACITY);
    }
}
