//! Biometric metric derivation
//!
//! The health-risk score is a hand-tuned additive heuristic kept for
//! compatibility with the assessment UI. It is not a validated clinical score
//! and must not be presented as medical advice.

use serde::{Deserialize, Serialize};

use crate::error::PulseError;
use crate::models::{
    ActivityLevel, AgeGroup, BiometricInput, BmiCategory, DerivedMetrics, HydrationLevel,
    PostureCategory, RiskLevel,
};

/// Recommended daily water intake per kilogram of body weight
const WATER_ML_PER_KG: f64 = 35.0;

/// Largest tolerated gap between a supplied and a recomputed BMI
const BMI_MISMATCH_TOLERANCE: f64 = 1.0;

/// Daily hydration target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hydration {
    pub daily_water_intake_ml: f64,
    pub daily_water_intake_liters: f64,
    pub hydration_level: HydrationLevel,
}

/// Round to one decimal from the exact binary value
///
/// 0.15 is stored just under 0.15, so it rounds down even though
/// `0.15 * 10.0` evaluates to exactly 1.5. True ties go away from zero.
#[inline]
fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    // exact remainder of the multiplication
    let error = value.mul_add(10.0, -scaled);
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 && error != 0.0 {
        if error > 0.0 {
            scaled.ceil()
        } else {
            scaled.floor()
        }
    } else {
        scaled.round()
    };
    rounded / 10.0
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), PulseError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PulseError::invalid(field, "must be a positive number"))
    }
}

/// Body-mass index, rounded to one decimal
pub fn compute_bmi(weight_kg: f64, height_cm: f64) -> Result<f64, PulseError> {
    ensure_positive("weightKg", weight_kg)?;
    ensure_positive("heightCm", height_cm)?;
    Ok(bmi_unchecked(weight_kg, height_cm))
}

/// Daily water target and hydration tier for a body weight
pub fn compute_hydration(weight_kg: f64) -> Result<Hydration, PulseError> {
    ensure_positive("weightKg", weight_kg)?;
    Ok(hydration_unchecked(weight_kg))
}

#[inline]
fn bmi_unchecked(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round1(weight_kg / (height_m * height_m))
}

fn hydration_unchecked(weight_kg: f64) -> Hydration {
    let daily_ml = weight_kg * WATER_ML_PER_KG;
    let hydration_level = if daily_ml < 2000.0 {
        HydrationLevel::Low
    } else if daily_ml < 2800.0 {
        HydrationLevel::Moderate
    } else {
        HydrationLevel::High
    };

    Hydration {
        daily_water_intake_ml: daily_ml,
        daily_water_intake_liters: round1(daily_ml / 1000.0),
        hydration_level,
    }
}

/// BMI contribution to the risk score (0-50 points)
///
/// Underweight is penalized, not rewarded.
#[inline]
fn bmi_points(bmi: f64) -> u8 {
    if bmi >= 35.0 {
        50
    } else if bmi >= 30.0 {
        40
    } else if bmi >= 25.0 {
        25
    } else if bmi >= 18.5 {
        10
    } else {
        30
    }
}

#[inline]
fn age_points(age: u8) -> u8 {
    match age {
        60.. => 30,
        45..=59 => 20,
        30..=44 => 10,
        _ => 0,
    }
}

#[inline]
fn activity_points(activity: Option<ActivityLevel>) -> u8 {
    match activity {
        Some(ActivityLevel::Sedentary) => 20,
        Some(ActivityLevel::LightlyActive) => 10,
        Some(ActivityLevel::ModeratelyActive) => 5,
        Some(ActivityLevel::VeryActive) => 0,
        None => 10,
    }
}

/// Composite health-risk score in 0-100
///
/// Sum of BMI (0-50), age (0-30) and activity (0-20) points, capped at 100.
/// An unknown activity level counts as 10 points.
pub fn compute_health_risk_score(bmi: f64, age: u8, activity: Option<ActivityLevel>) -> u8 {
    let total = bmi_points(bmi) as u16 + age_points(age) as u16 + activity_points(activity) as u16;
    total.min(100) as u8
}

/// BMI and score conditions are OR'd and checked High first
pub fn classify_risk(bmi: f64, health_risk_score: u8) -> RiskLevel {
    if bmi >= 30.0 || health_risk_score >= 70 {
        RiskLevel::High
    } else if bmi >= 25.0 || health_risk_score >= 40 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

pub fn classify_age(age: u8) -> AgeGroup {
    match age {
        0..=29 => AgeGroup::Young,
        30..=44 => AgeGroup::Adult,
        45..=59 => AgeGroup::Midlife,
        _ => AgeGroup::Senior,
    }
}

pub fn classify_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

pub fn classify_posture(posture_score: u8) -> PostureCategory {
    if posture_score < 40 {
        PostureCategory::Poor
    } else if posture_score < 70 {
        PostureCategory::Average
    } else {
        PostureCategory::Good
    }
}

/// Keep the recomputed BMI, warning when a client-supplied value disagrees
pub fn reconcile_bmi(computed: f64, supplied: Option<f64>) -> f64 {
    if let Some(supplied) = supplied {
        if !supplied.is_finite() || (computed - supplied).abs() > BMI_MISMATCH_TOLERANCE {
            tracing::warn!(
                supplied_bmi = supplied,
                computed_bmi = computed,
                "BMI mismatch, using computed value"
            );
        }
    }
    computed
}

/// Run every derivation for a validated input
pub fn derive_metrics(input: &BiometricInput) -> DerivedMetrics {
    // BiometricInput guarantees positive, finite weight and height
    let bmi = bmi_unchecked(input.weight_kg(), input.height_cm());
    let hydration = hydration_unchecked(input.weight_kg());

    let health_risk_score =
        compute_health_risk_score(bmi, input.age(), Some(input.activity_level()));

    DerivedMetrics {
        bmi,
        bmi_category: classify_bmi(bmi),
        hydration_level: hydration.hydration_level,
        daily_water_intake_ml: hydration.daily_water_intake_ml,
        daily_water_intake_liters: hydration.daily_water_intake_liters,
        health_risk_score,
        risk_level: classify_risk(bmi, health_risk_score),
        age_group: classify_age(input.age()),
        posture_category: classify_posture(input.posture_score()),
        activity_level: input.activity_level(),
    }
}
