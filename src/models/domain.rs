use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PulseError;

/// Self-reported physical activity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "Sedentary", alias = "sedentary")]
    Sedentary,
    #[serde(rename = "Lightly Active", alias = "LightlyActive", alias = "lightly_active")]
    LightlyActive,
    #[serde(
        rename = "Moderately Active",
        alias = "ModeratelyActive",
        alias = "moderately_active"
    )]
    ModeratelyActive,
    #[serde(rename = "Very Active", alias = "VeryActive", alias = "very_active")]
    VeryActive,
}

impl ActivityLevel {
    pub const ALL: [ActivityLevel; 4] = [
        ActivityLevel::Sedentary,
        ActivityLevel::LightlyActive,
        ActivityLevel::ModeratelyActive,
        ActivityLevel::VeryActive,
    ];

    /// Human-readable label, as shown in the assessment form
    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary",
            ActivityLevel::LightlyActive => "Lightly Active",
            ActivityLevel::ModeratelyActive => "Moderately Active",
            ActivityLevel::VeryActive => "Very Active",
        }
    }

    /// Parse a label in form, enum or snake_case spelling
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "sedentary" => Some(ActivityLevel::Sedentary),
            "lightlyactive" => Some(ActivityLevel::LightlyActive),
            "moderatelyactive" => Some(ActivityLevel::ModeratelyActive),
            "veryactive" => Some(ActivityLevel::VeryActive),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub const ALL: [BmiCategory; 4] = [
        BmiCategory::Underweight,
        BmiCategory::Normal,
        BmiCategory::Overweight,
        BmiCategory::Obese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "underweight",
            BmiCategory::Normal => "normal",
            BmiCategory::Overweight => "overweight",
            BmiCategory::Obese => "obese",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Young,
    Adult,
    Midlife,
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::Young,
        AgeGroup::Adult,
        AgeGroup::Midlife,
        AgeGroup::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Young => "young",
            AgeGroup::Adult => "adult",
            AgeGroup::Midlife => "midlife",
            AgeGroup::Senior => "senior",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostureCategory {
    Poor,
    Average,
    Good,
}

impl PostureCategory {
    pub const ALL: [PostureCategory; 3] = [
        PostureCategory::Poor,
        PostureCategory::Average,
        PostureCategory::Good,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostureCategory::Poor => "poor",
            PostureCategory::Average => "average",
            PostureCategory::Good => "good",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HydrationLevel {
    Low,
    Moderate,
    High,
}

impl HydrationLevel {
    pub const ALL: [HydrationLevel; 3] = [
        HydrationLevel::Low,
        HydrationLevel::Moderate,
        HydrationLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HydrationLevel::Low => "Low",
            HydrationLevel::Moderate => "Moderate",
            HydrationLevel::High => "High",
        }
    }
}

/// Coarse health-risk classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }

    /// Exact, case-sensitive match against the three level names
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(RiskLevel::Low),
            "Moderate" => Some(RiskLevel::Moderate),
            "High" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw biometric input for a single request
///
/// Fields are private so every instance has passed the range checks in
/// [`BiometricInput::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricInput {
    age: u8,
    weight_kg: f64,
    height_cm: f64,
    activity_level: ActivityLevel,
    posture_score: u8,
}

impl BiometricInput {
    pub fn new(
        age: i64,
        weight_kg: f64,
        height_cm: f64,
        activity_level: ActivityLevel,
        posture_score: i64,
    ) -> Result<Self, PulseError> {
        if !(0..=120).contains(&age) {
            return Err(PulseError::invalid("age", format!("{} is outside 0-120", age)));
        }
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(PulseError::invalid("weightKg", "must be a positive number"));
        }
        if !height_cm.is_finite() || height_cm <= 0.0 {
            return Err(PulseError::invalid("heightCm", "must be a positive number"));
        }
        if !(0..=100).contains(&posture_score) {
            return Err(PulseError::invalid(
                "postureScore",
                format!("{} is outside 0-100", posture_score),
            ));
        }

        Ok(Self {
            age: age as u8,
            weight_kg,
            height_cm,
            activity_level,
            posture_score: posture_score as u8,
        })
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn activity_level(&self) -> ActivityLevel {
        self.activity_level
    }

    pub fn posture_score(&self) -> u8 {
        self.posture_score
    }
}

/// Metrics derived from a [`BiometricInput`], recomputed on every call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub hydration_level: HydrationLevel,
    pub daily_water_intake_ml: f64,
    pub daily_water_intake_liters: f64,
    pub health_risk_score: u8,
    pub risk_level: RiskLevel,
    pub age_group: AgeGroup,
    pub posture_category: PostureCategory,
    pub activity_level: ActivityLevel,
}

/// Normalized image-space keypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Positional keypoint indices shared with the pose estimator
pub mod landmark_index {
    pub const NOSE: usize = 0;
    pub const LEFT_EAR: usize = 7;
    pub const RIGHT_EAR: usize = 8;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;

    pub const REQUIRED: [usize; 7] = [
        NOSE,
        LEFT_EAR,
        RIGHT_EAR,
        LEFT_SHOULDER,
        RIGHT_SHOULDER,
        LEFT_HIP,
        RIGHT_HIP,
    ];
}

/// Ordered keypoints for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(pub Vec<Landmark>);

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self(points)
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self(points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostureStatus {
    Good,
    Fair,
    Poor,
}

/// Posture score for a single frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureResult {
    pub score: u8,
    pub issues: Vec<String>,
    pub status: PostureStatus,
}

/// Five-section health recommendation document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDocument {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub preventive_actions: Vec<String>,
    #[serde(default)]
    pub important_flags: Vec<String>,
}

impl fmt::Display for RecommendationDocument {
    /// Render in the same section grammar the response parser reads
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f, "Recommendations:")?;
        for item in &self.recommendations {
            writeln!(f, "- {}", item)?;
        }
        writeln!(f, "Risk Level:")?;
        writeln!(f, "{}", self.risk_level)?;
        writeln!(f, "Preventive Actions:")?;
        for item in &self.preventive_actions {
            writeln!(f, "- {}", item)?;
        }
        if !self.important_flags.is_empty() {
            writeln!(f, "Important Flags:")?;
            for item in &self.important_flags {
                writeln!(f, "- {}", item)?;
            }
        }
        Ok(())
    }
}

/// Which composer produces the recommendation text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    #[default]
    RuleBased,
    AiBacked,
}
