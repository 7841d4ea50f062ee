//! Input validation — the gate every record passes before any evaluator runs.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. the input is a JSON object
//! 2. every required field is present
//! 3. `risk_score` and `bias_score` are numbers in `[0, 1]`
//! 4. `risk_level` is an integer in `{0, 1, 2}`
//! 5. `features` is a non-empty list of strings

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{EvaluationRequest, REQUIRED_FIELDS, RiskLevel};

/// Parses raw JSON into a typed [`EvaluationRequest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `input` and return the typed request on success.
    pub fn validate(&self, input: &Value) -> Result<EvaluationRequest, ValidationError> {
        let object = input.as_object().ok_or_else(|| ValidationError::NotAnObject {
            found: json_type_name(input).to_string(),
        })?;

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(ValidationError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        let risk_score = unit_interval(object, "risk_score")?;
        let bias_score = unit_interval(object, "bias_score")?;
        let risk_level = risk_level(&object["risk_level"])?;
        let features = features(&object["features"])?;

        let extra: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !REQUIRED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(EvaluationRequest {
            risk_score,
            bias_score,
            risk_level,
            features,
            extra,
        })
    }
}

fn unit_interval(object: &Map<String, Value>, field: &str) -> Result<f64, ValidationError> {
    let value = &object[field];
    let number = value.as_f64().ok_or_else(|| ValidationError::NotANumber {
        field: field.to_string(),
        found: json_type_name(value).to_string(),
    })?;

    if !number.is_finite() || !(0.0..=1.0).contains(&number) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: number,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(number)
}

fn risk_level(value: &Value) -> Result<RiskLevel, ValidationError> {
    let invalid = || ValidationError::InvalidRiskLevel {
        found: value.to_string(),
    };

    let level = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else {
                // Integral floats such as `1.0` are accepted.
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= 0.0 => f as u64,
                    _ => return Err(invalid()),
                }
            }
        }
        _ => return Err(invalid()),
    };

    u8::try_from(level)
        .ok()
        .and_then(|l| RiskLevel::try_from(l).ok())
        .ok_or_else(invalid)
}

fn features(value: &Value) -> Result<Vec<String>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::InvalidFeatures {
            reason: format!("expected a list, got {}", json_type_name(value)),
        })?;

    if items.is_empty() {
        return Err(ValidationError::InvalidFeatures {
            reason: "list is empty".to_string(),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidationError::InvalidFeatures {
                    reason: format!("item {i} is {}, not a string", json_type_name(item)),
                })
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
