//! Error types for the risk governance core.
//!
//! Uses `thiserror` for public API error types. Every failure a caller can observe
//! surfaces as an [`OrchestrationError`], which wraps input validation failures,
//! evaluator failures, configuration problems, and anything unexpected.

/// Top-level error type surfaced to callers of the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unexpected orchestration failure: {message}")]
    Unexpected {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl OrchestrationError {
    /// Wrap an unclassified error, keeping the original cause for diagnostics.
    pub fn unexpected<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unexpected {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error was raised before any evaluator was dispatched.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Errors raised while checking the shape of an input record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Input must be a JSON object, got {found}")]
    NotAnObject { found: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Field '{field}' must be a number, got {found}")]
    NotANumber { field: String, found: String },

    #[error("Field '{field}' must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Field 'risk_level' must be an integer in {{0, 1, 2}}, got {found}")]
    InvalidRiskLevel { found: String },

    #[error("Field 'features' must be a non-empty list of strings: {reason}")]
    InvalidFeatures { reason: String },
}

/// Errors raised by an individual evaluator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluatorError {
    #[error("Evaluator '{evaluator}' is missing required field: {field}")]
    MissingField { evaluator: String, field: String },

    #[error("Evaluator '{evaluator}' failed: {message}")]
    Failed { evaluator: String, message: String },

    #[error("Evaluator '{evaluator}' panicked: {message}")]
    Panicked { evaluator: String, message: String },
}

impl EvaluatorError {
    /// Name of the evaluator that produced this error.
    pub fn evaluator(&self) -> &str {
        match self {
            Self::MissingField { evaluator, .. }
            | Self::Failed { evaluator, .. }
            | Self::Panicked { evaluator, .. } => evaluator,
        }
    }

    /// Convenience constructor for a generic evaluator failure.
    pub fn failed(evaluator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            evaluator: evaluator.into(),
            message: message.into(),
        }
    }
}

/// Errors from configuration and orchestrator construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Duplicate evaluator name: {name}")]
    DuplicateEvaluator { name: String },

    #[error("Orchestrator requires at least one evaluator")]
    NoEvaluators,
}

/// A type alias for results using the top-level `OrchestrationError`.
pub type Result<T> = std::result::Result<T, OrchestrationError>;
