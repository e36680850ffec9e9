//! Static rule catalog for the rule-based recommendation strategy
//!
//! The catalog is a versioned TOML document. Every category value is a
//! required table, so a catalog that deserializes covers every enum value the
//! composer can be asked about.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    ActivityLevel, AgeGroup, BmiCategory, DerivedMetrics, HydrationLevel, PostureCategory,
    RiskLevel,
};

/// Catalog document format understood by this build
pub const CATALOG_VERSION: u32 = 1;

const BUILTIN_CATALOG: &str = include_str!("../../config/catalog.toml");

/// Errors that can occur when loading a rule catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unsupported catalog version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Invalid catalog entry {0}")]
    Invalid(String),
}

/// Text fragments for one category value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub preventive_actions: Vec<String>,
    #[serde(default)]
    pub urgency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BmiRules {
    pub underweight: RuleEntry,
    pub normal: RuleEntry,
    pub overweight: RuleEntry,
    pub obese: RuleEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgeRules {
    pub young: RuleEntry,
    pub adult: RuleEntry,
    pub midlife: RuleEntry,
    pub senior: RuleEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelRules {
    pub low: RuleEntry,
    pub moderate: RuleEntry,
    pub high: RuleEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostureRules {
    pub poor: RuleEntry,
    pub average: RuleEntry,
    pub good: RuleEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityRules {
    pub sedentary: RuleEntry,
    pub lightly_active: RuleEntry,
    pub moderately_active: RuleEntry,
    pub very_active: RuleEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlagTexts {
    pub high_risk_sedentary: String,
    pub high_risk_young: String,
    pub senior_elevated_risk: String,
    pub low_hydration_high_risk: String,
    pub poor_posture_high_risk: String,
}

/// Named conjunctions of categories that add an important flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinedRiskFlag {
    HighRiskSedentary,
    HighRiskYoung,
    SeniorElevatedRisk,
    LowHydrationHighRisk,
    PoorPostureHighRisk,
}

impl CombinedRiskFlag {
    /// Evaluation and output order
    pub const ALL: [CombinedRiskFlag; 5] = [
        CombinedRiskFlag::HighRiskSedentary,
        CombinedRiskFlag::HighRiskYoung,
        CombinedRiskFlag::SeniorElevatedRisk,
        CombinedRiskFlag::LowHydrationHighRisk,
        CombinedRiskFlag::PoorPostureHighRisk,
    ];

    pub fn applies(&self, metrics: &DerivedMetrics) -> bool {
        let high = metrics.risk_level == RiskLevel::High;
        match self {
            CombinedRiskFlag::HighRiskSedentary => {
                high && metrics.activity_level == ActivityLevel::Sedentary
            }
            CombinedRiskFlag::HighRiskYoung => high && metrics.age_group == AgeGroup::Young,
            CombinedRiskFlag::SeniorElevatedRisk => {
                metrics.risk_level != RiskLevel::Low && metrics.age_group == AgeGroup::Senior
            }
            CombinedRiskFlag::LowHydrationHighRisk => {
                high && metrics.hydration_level == HydrationLevel::Low
            }
            CombinedRiskFlag::PoorPostureHighRisk => {
                high && metrics.posture_category == PostureCategory::Poor
            }
        }
    }

    /// Every flag that holds, in fixed order; overlapping flags are all kept
    pub fn evaluate(metrics: &DerivedMetrics) -> Vec<CombinedRiskFlag> {
        Self::ALL
            .iter()
            .copied()
            .filter(|flag| flag.applies(metrics))
            .collect()
    }
}

/// Read-only lookup table from derived categories to text fragments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleCatalog {
    pub version: u32,
    pub bmi: BmiRules,
    pub age: AgeRules,
    pub risk: LevelRules,
    pub posture: PostureRules,
    pub hydration: LevelRules,
    pub activity: ActivityRules,
    pub flags: FlagTexts,
}

impl RuleCatalog {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Load and validate a catalog document from disk
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded rule catalog from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: RuleCatalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject catalogs that would let the composer emit an empty section
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.version != CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: self.version,
                expected: CATALOG_VERSION,
            });
        }

        let mut entries: Vec<(String, &RuleEntry)> = Vec::new();
        entries.extend(BmiCategory::ALL.iter().map(|c| (format!("bmi.{}", c.as_str()), self.bmi(*c))));
        entries.extend(AgeGroup::ALL.iter().map(|c| (format!("age.{}", c.as_str()), self.age(*c))));
        entries.extend(RiskLevel::ALL.iter().map(|c| (format!("risk.{}", c.as_str()), self.risk(*c))));
        entries.extend(
            PostureCategory::ALL
                .iter()
                .map(|c| (format!("posture.{}", c.as_str()), self.posture(*c))),
        );
        entries.extend(
            HydrationLevel::ALL
                .iter()
                .map(|c| (format!("hydration.{}", c.as_str()), self.hydration(*c))),
        );
        entries.extend(
            ActivityLevel::ALL
                .iter()
                .map(|c| (format!("activity.{}", c.label()), self.activity(*c))),
        );

        for (key, entry) in &entries {
            if entry.summary.trim().is_empty() {
                return Err(CatalogError::Invalid(format!("{}: empty summary", key)));
            }
        }

        for category in BmiCategory::ALL {
            let entry = self.bmi(category);
            if entry.recommendations.iter().all(|r| r.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "bmi.{}: needs at least one recommendation",
                    category.as_str()
                )));
            }
            if entry.preventive_actions.iter().all(|r| r.trim().is_empty()) {
                return Err(CatalogError::Invalid(format!(
                    "bmi.{}: needs at least one preventive action",
                    category.as_str()
                )));
            }
        }

        for level in RiskLevel::ALL {
            let urgent = self.risk(level).urgency.as_deref().unwrap_or("");
            if urgent.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "risk.{}: missing urgency phrase",
                    level.as_str()
                )));
            }
        }

        for flag in CombinedRiskFlag::ALL {
            if self.flag_text(flag).trim().is_empty() {
                return Err(CatalogError::Invalid(format!("flags.{:?}: empty text", flag)));
            }
        }

        Ok(())
    }

    pub fn bmi(&self, category: BmiCategory) -> &RuleEntry {
        match category {
            BmiCategory::Underweight => &self.bmi.underweight,
            BmiCategory::Normal => &self.bmi.normal,
            BmiCategory::Overweight => &self.bmi.overweight,
            BmiCategory::Obese => &self.bmi.obese,
        }
    }

    pub fn age(&self, group: AgeGroup) -> &RuleEntry {
        match group {
            AgeGroup::Young => &self.age.young,
            AgeGroup::Adult => &self.age.adult,
            AgeGroup::Midlife => &self.age.midlife,
            AgeGroup::Senior => &self.age.senior,
        }
    }

    pub fn risk(&self, level: RiskLevel) -> &RuleEntry {
        match level {
            RiskLevel::Low => &self.risk.low,
            RiskLevel::Moderate => &self.risk.moderate,
            RiskLevel::High => &self.risk.high,
        }
    }

    pub fn posture(&self, category: PostureCategory) -> &RuleEntry {
        match category {
            PostureCategory::Poor => &self.posture.poor,
            PostureCategory::Average => &self.posture.average,
            PostureCategory::Good => &self.posture.good,
        }
    }

    pub fn hydration(&self, level: HydrationLevel) -> &RuleEntry {
        match level {
            HydrationLevel::Low => &self.hydration.low,
            HydrationLevel::Moderate => &self.hydration.moderate,
            HydrationLevel::High => &self.hydration.high,
        }
    }

    pub fn activity(&self, level: ActivityLevel) -> &RuleEntry {
        match level {
            ActivityLevel::Sedentary => &self.activity.sedentary,
            ActivityLevel::LightlyActive => &self.activity.lightly_active,
            ActivityLevel::ModeratelyActive => &self.activity.moderately_active,
            ActivityLevel::VeryActive => &self.activity.very_active,
        }
    }

    pub fn flag_text(&self, flag: CombinedRiskFlag) -> &str {
        match flag {
            CombinedRiskFlag::HighRiskSedentary => &self.flags.high_risk_sedentary,
            CombinedRiskFlag::HighRiskYoung => &self.flags.high_risk_young,
            CombinedRiskFlag::SeniorElevatedRisk => &self.flags.senior_elevated_risk,
            CombinedRiskFlag::LowHydrationHighRisk => &self.flags.low_hydration_high_risk,
            CombinedRiskFlag::PoorPostureHighRisk => &self.flags.poor_posture_high_risk,
        }
    }

    /// Urgency phrase for a risk level
    pub fn urgency(&self, level: RiskLevel) -> &str {
        self.risk(level).urgency.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(risk: RiskLevel, age: AgeGroup, activity: ActivityLevel) -> DerivedMetrics {
        DerivedMetrics {
            bmi: 31.0,
            bmi_category: BmiCategory::Obese,
            hydration_level: HydrationLevel::High,
            daily_water_intake_ml: 3150.0,
            daily_water_intake_liters: 3.2,
            health_risk_score: 80,
            risk_level: risk,
            age_group: age,
            posture_category: PostureCategory::Good,
            activity_level: activity,
        }
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = RuleCatalog::builtin().unwrap();
        assert_eq!(catalog.version, CATALOG_VERSION);
        assert!(!catalog.urgency(RiskLevel::High).is_empty());
    }

    #[test]
    fn test_empty_bmi_recommendations_rejected() {
        let broken = BUILTIN_CATALOG.replacen(
            "recommendations = [\n    \"Keep a balanced plate of vegetables, lean protein and whole grains\",\n    \"Maintain at least 150 minutes of moderate activity per week\",\n]",
            "recommendations = []",
            1,
        );
        assert_ne!(broken, BUILTIN_CATALOG);

        let err = RuleCatalog::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn test_missing_category_is_parse_error() {
        let broken = BUILTIN_CATALOG.replace("[bmi.obese]", "[bmi.extreme]");
        let err = RuleCatalog::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let broken = BUILTIN_CATALOG.replace("version = 1", "version = 2");
        let err = RuleCatalog::from_toml_str(&broken).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_flags_overlap_not_coalesced() {
        let m = metrics(RiskLevel::High, AgeGroup::Senior, ActivityLevel::Sedentary);
        assert_eq!(
            CombinedRiskFlag::evaluate(&m),
            vec![
                CombinedRiskFlag::HighRiskSedentary,
                CombinedRiskFlag::SeniorElevatedRisk
            ]
        );
    }

    #[test]
    fn test_senior_moderate_risk_flagged() {
        let m = metrics(RiskLevel::Moderate, AgeGroup::Senior, ActivityLevel::VeryActive);
        assert_eq!(
            CombinedRiskFlag::evaluate(&m),
            vec![CombinedRiskFlag::SeniorElevatedRisk]
        );

        let m = metrics(RiskLevel::Low, AgeGroup::Senior, ActivityLevel::VeryActive);
        assert!(CombinedRiskFlag::evaluate(&m).is_empty());
    }
}
