use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::PulseError;
use crate::models::domain::{ActivityLevel, BiometricInput, Landmark, LandmarkSet, Strategy};

/// A numeric form field as it arrived on the wire
///
/// Anything that is not a JSON number is kept as-is so the conversion can
/// name the field instead of failing the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Number(f64),
    Other(serde_json::Value),
}

/// Biometric fields as submitted by the assessment form
///
/// Everything is optional and loosely typed on the wire so a missing or
/// malformed field can be reported by name instead of failing JSON
/// deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BiometricRequest {
    pub age: Option<WireNumber>,
    #[serde(alias = "weight")]
    pub weight_kg: Option<WireNumber>,
    #[serde(alias = "height")]
    pub height_cm: Option<WireNumber>,
    #[validate(length(min = 1, max = 64))]
    pub activity_level: Option<String>,
    pub posture_score: Option<WireNumber>,
}

fn number(field: &'static str, value: Option<&WireNumber>) -> Result<f64, PulseError> {
    match value {
        None => Err(PulseError::invalid(field, "is required")),
        Some(WireNumber::Number(n)) => Ok(*n),
        Some(WireNumber::Other(raw)) => {
            Err(PulseError::invalid(field, format!("must be a number, got {}", raw)))
        }
    }
}

fn whole_number(field: &'static str, value: Option<&WireNumber>) -> Result<i64, PulseError> {
    let n = number(field, value)?;
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(PulseError::invalid(field, format!("must be a whole number, got {}", n)));
    }
    // Saturating cast; out-of-range values are rejected by BiometricInput::new
    Ok(n as i64)
}

/// Wire name of a struct field reported by `validator`
fn wire_name(field: &str) -> &'static str {
    match field {
        "age" => "age",
        "weight_kg" => "weightKg",
        "height_cm" => "heightCm",
        "activity_level" => "activityLevel",
        "posture_score" => "postureScore",
        _ => "body",
    }
}

fn validation_error(errors: &ValidationErrors) -> PulseError {
    let mut failures: Vec<(String, String)> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let code = errs.first().map(|e| e.code.to_string()).unwrap_or_default();
            (field.to_string(), code)
        })
        .collect();
    failures.sort();

    match failures.into_iter().next() {
        Some((field, code)) => PulseError::invalid(wire_name(&field), format!("failed {} check", code)),
        None => PulseError::invalid("body", errors.to_string()),
    }
}

impl BiometricRequest {
    /// Run the declarative field rules, then convert into a core input
    pub fn check(&self) -> Result<BiometricInput, PulseError> {
        self.validate().map_err(|errors| validation_error(&errors))?;
        self.to_input()
    }

    /// Convert into a validated core input, naming the first bad field
    pub fn to_input(&self) -> Result<BiometricInput, PulseError> {
        let age = whole_number("age", self.age.as_ref())?;
        let weight_kg = number("weightKg", self.weight_kg.as_ref())?;
        let height_cm = number("heightCm", self.height_cm.as_ref())?;
        let label = self
            .activity_level
            .as_deref()
            .ok_or_else(|| PulseError::invalid("activityLevel", "is required"))?;
        let activity_level = ActivityLevel::parse(label).ok_or_else(|| {
            PulseError::invalid("activityLevel", format!("unknown activity level '{}'", label))
        })?;
        let posture_score = whole_number("postureScore", self.posture_score.as_ref())?;

        BiometricInput::new(age, weight_kg, height_cm, activity_level, posture_score)
    }
}

/// Request body for the recommendations endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub biometrics: BiometricRequest,
    #[serde(default)]
    pub strategy: Strategy,
    /// Client-side BMI, compared against the recomputed value only
    #[serde(default)]
    pub bmi: Option<f64>,
    /// Use the rule catalog when the AI output fails validation
    #[serde(default)]
    pub fallback_to_rules: bool,
}

/// Request body for the posture scoring endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl ScoreRequest {
    pub fn landmark_set(&self) -> LandmarkSet {
        LandmarkSet::new(self.landmarks.clone())
    }
}
