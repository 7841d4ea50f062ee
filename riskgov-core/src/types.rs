//! Fundamental types shared by the validator, the evaluators, and the orchestrator.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Names of the fields every input record must carry, in validation order.
pub const REQUIRED_FIELDS: [&str; 4] = ["risk_score", "bias_score", "risk_level", "features"];

/// Coarse risk band supplied by the caller (`0`, `1` or `2` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RiskLevel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl From<RiskLevel> for u8 {
    fn from(level: RiskLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for RiskLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RiskLevel::Low),
            1 => Ok(RiskLevel::Medium),
            2 => Ok(RiskLevel::High),
            other => Err(format!("risk level {other} is not one of 0, 1, 2")),
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Approval-style outcome an evaluator may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Review,
    Reject,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approve => write!(f, "Approve"),
            Decision::Review => write!(f, "Review"),
            Decision::Reject => write!(f, "Reject"),
        }
    }
}

/// A validated input record.
///
/// Only [`crate::validator::InputValidator`] builds these from untrusted JSON, so the
/// typed fields are always in range. Fields beyond the required four are carried in
/// `extra` and passed through to evaluators untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub risk_score: f64,
    pub bias_score: f64,
    pub risk_level: RiskLevel,
    pub features: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EvaluationRequest {
    /// Whether the record carries a field with the given name.
    pub fn has_field(&self, name: &str) -> bool {
        REQUIRED_FIELDS.contains(&name) || self.extra.contains_key(name)
    }
}

/// Last-known state of an evaluator within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorStatus {
    Healthy,
    Failed,
}

impl std::fmt::Display for EvaluatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorStatus::Healthy => write!(f, "healthy"),
            EvaluatorStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Output of one evaluator for one run.
///
/// The well-known fields are the ones cross-evaluator analysis consumes; anything
/// evaluator-specific goes into `extra`. A failed evaluation carries `error` and
/// `status = failed` instead of the normal fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_flagged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EvaluatorStatus>,
    /// Wall-clock seconds spent in the evaluator. Zero for failures.
    #[serde(default)]
    pub execution_time: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EvaluationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result slot for an evaluator whose call failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            status: Some(EvaluatorStatus::Failed),
            execution_time: 0.0,
            ..Default::default()
        }
    }

    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_compliant(mut self, compliant: bool) -> Self {
        self.compliant = Some(compliant);
        self
    }

    pub fn with_bias_flagged(mut self, flagged: bool) -> Self {
        self.bias_flagged = Some(flagged);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Attach an evaluator-specific field.
    ///
    /// A key naming one of the well-known fields sets that field instead of landing in
    /// `extra`, so `with_field("error", ..)` marks the result as failed.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if RESERVED_RESULT_FIELDS.contains(&key.as_str()) {
            self.set_reserved(&key, value);
        } else {
            self.extra.insert(key, value);
        }
        self
    }

    /// Move any well-known keys that ended up in `extra` onto their typed fields.
    pub fn normalize(&mut self) {
        for key in RESERVED_RESULT_FIELDS {
            if let Some(value) = self.extra.remove(key) {
                self.set_reserved(key, value);
            }
        }
    }

    fn set_reserved(&mut self, key: &str, value: Value) {
        match key {
            "decision" => {
                if let Some(decision) = reserved_value(key, value) {
                    self.decision = decision;
                }
            }
            "compliant" => {
                if let Some(compliant) = reserved_value(key, value) {
                    self.compliant = compliant;
                }
            }
            "bias_flagged" => {
                if let Some(flagged) = reserved_value(key, value) {
                    self.bias_flagged = flagged;
                }
            }
            "explanation" => {
                if let Some(explanation) = reserved_value(key, value) {
                    self.explanation = explanation;
                }
            }
            "status" => {
                if let Some(status) = reserved_value(key, value) {
                    self.status = status;
                }
            }
            "execution_time" => {
                if let Some(secs) = reserved_value(key, value) {
                    self.execution_time = secs;
                }
            }
            "error" => {
                let message = match value {
                    Value::Null => return,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.error = Some(message);
                self.status = Some(EvaluatorStatus::Failed);
            }
            _ => {}
        }
    }

    /// Whether this slot records a failure.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Result keys with a typed field on [`EvaluationResult`]. These never live in `extra`.
///
/// `error` follows `status` so a failure always wins when both are present.
pub const RESERVED_RESULT_FIELDS: [&str; 7] = [
    "decision",
    "compliant",
    "bias_flagged",
    "explanation",
    "status",
    "error",
    "execution_time",
];

fn reserved_value<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(field = key, error = %e, "Dropping malformed result field");
            None
        }
    }
}

/// Per-evaluator results of one run, kept in evaluator declaration order.
///
/// Serializes as a JSON object keyed by evaluator name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResults {
    entries: Vec<(String, EvaluationResult)>,
}

impl AgentResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert a result, replacing any earlier entry for the same evaluator in place.
    ///
    /// The result is normalized first, so aggregation only ever reads typed fields.
    pub fn insert(&mut self, name: impl Into<String>, mut result: EvaluationResult) {
        result.normalize();
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = result;
        } else {
            self.entries.push((name, result));
        }
    }

    pub fn get(&self, name: &str) -> Option<&EvaluationResult> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, result)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvaluationResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for AgentResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, result) in &self.entries {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

/// Serialize `(name, value)` pairs as a JSON object, keeping their order.
#[allow(clippy::ptr_arg)]
pub(crate) fn ordered_map<S, V>(entries: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

/// How the coordinator dispatches evaluators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One evaluator at a time, in declaration order.
    Sequential,
    /// Every evaluator on its own blocking worker, joined before aggregation.
    #[default]
    Concurrent,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" | "parallel" => Ok(ExecutionMode::Concurrent),
            other => Err(format!(
                "unknown execution mode '{other}' (expected sequential or concurrent)"
            )),
        }
    }
}

/// Outcome classification of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Success,
    PartialFailure,
    Failure,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Success => write!(f, "success"),
            OverallStatus::PartialFailure => write!(f, "partial_failure"),
            OverallStatus::Failure => write!(f, "failure"),
        }
    }
}
