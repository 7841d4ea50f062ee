//! Configuration system for the risk governance orchestrator.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/riskgov/config.toml` and/or `.riskgov/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::evaluators::DEFAULT_HEALTH_ERROR_RATE;
use crate::evaluators::bias_audit::DEFAULT_BIAS_THRESHOLD;
use crate::evaluators::compliance::DEFAULT_COMPLIANCE_THRESHOLD;
use crate::types::ExecutionMode;

/// Default capacity of the bounded execution history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default per-evaluator latency (seconds) above which a slowdown is reported.
pub const DEFAULT_LATENCY_THRESHOLD_SECS: f64 = 1.0;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub evaluators: EvaluatorSettings,
}

impl GovernanceConfig {
    /// Validate every section and return human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for w in self.orchestrator.validate() {
            warnings.push(format!("[orchestrator] {}", w));
        }
        for w in self.evaluators.validate() {
            warnings.push(format!("[evaluators] {}", w));
        }
        warnings
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: format!("cannot render configuration: {e}"),
        })
    }
}

/// Orchestration engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Dispatch mode used when the caller does not pick one.
    pub mode: ExecutionMode,
    /// Absorb evaluator failures into their result slot instead of aborting the run.
    pub continue_on_error: bool,
    /// Upper bound on concurrently running evaluators. `None` means one worker each.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
    /// Number of past runs kept in the in-memory history.
    pub history_capacity: usize,
    /// Evaluators slower than this (seconds) trigger a performance recommendation.
    pub latency_threshold_secs: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            continue_on_error: true,
            max_workers: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            latency_threshold_secs: DEFAULT_LATENCY_THRESHOLD_SECS,
        }
    }
}

impl OrchestratorConfig {
    /// Returns an empty Vec if the config is valid, otherwise warning messages.
    ///
    /// Out-of-range values are clamped at use sites, so these never fail loading.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.history_capacity == 0 {
            warnings.push("history_capacity is 0 — at least one run is always kept".to_string());
        }

        if self.max_workers == Some(0) {
            warnings.push("max_workers is 0 — a single worker will be used".to_string());
        }

        if self.latency_threshold_secs.is_nan() {
            warnings.push(
                "latency_threshold_secs is NaN — no evaluator will be reported as slow".to_string(),
            );
        } else if self.latency_threshold_secs == f64::INFINITY {
            warnings.push(
                "latency_threshold_secs is infinite — no evaluator will be reported as slow"
                    .to_string(),
            );
        } else if self.latency_threshold_secs < 0.0 {
            warnings.push(format!(
                "latency_threshold_secs is {} — every evaluator will be reported as slow",
                self.latency_threshold_secs
            ));
        }

        warnings
    }

    /// History capacity with the minimum of one applied.
    pub fn effective_history_capacity(&self) -> usize {
        self.history_capacity.max(1)
    }
}

/// Thresholds for the reference evaluators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Risk scores at or above this are non-compliant.
    pub compliance_threshold: f64,
    /// Bias scores above this are flagged.
    pub bias_threshold: f64,
    /// Error rate at or above which an evaluator reports degraded health.
    pub health_error_rate: f64,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            compliance_threshold: DEFAULT_COMPLIANCE_THRESHOLD,
            bias_threshold: DEFAULT_BIAS_THRESHOLD,
            health_error_rate: DEFAULT_HEALTH_ERROR_RATE,
        }
    }
}

impl EvaluatorSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, value) in [
            ("compliance_threshold", self.compliance_threshold),
            ("bias_threshold", self.bias_threshold),
            ("health_error_rate", self.health_error_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(format!("{} is {} — expected a value in [0, 1]", name, value));
            }
        }
        warnings
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `RISKGOV_`)
/// 3. Workspace-local config (`.riskgov/config.toml`)
/// 4. User config (`~/.config/riskgov/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&GovernanceConfig>,
) -> Result<GovernanceConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(GovernanceConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "riskgov", "riskgov") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".riskgov").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (RISKGOV_ORCHESTRATOR__MODE, RISKGOV_EVALUATORS__BIAS_THRESHOLD, ...)
    figment = figment.merge(Env::prefixed("RISKGOV_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Load configuration from a single explicit TOML file layered over the defaults.
pub fn load_config_file(path: &Path) -> Result<GovernanceConfig, Box<figment::Error>> {
    Figment::from(Serialized::defaults(GovernanceConfig::default()))
        .merge(Toml::file(path))
        .extract()
        .map_err(Box::new)
}
