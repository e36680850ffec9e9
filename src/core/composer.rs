use std::sync::Arc;

use crate::core::catalog::{CombinedRiskFlag, RuleCatalog};
use crate::models::{DerivedMetrics, RecommendationDocument};

/// Posture tips taken into the recommendations section
const POSTURE_TIPS: usize = 2;

/// Activity tips taken into the preventive-actions section
const ACTIVITY_TIPS: usize = 2;

/// Deterministic recommendation composer backed by the rule catalog
#[derive(Debug, Clone)]
pub struct RuleComposer {
    catalog: Arc<RuleCatalog>,
}

impl RuleComposer {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Assemble the five-section document for a set of derived metrics
    ///
    /// # Composition
    /// - summary: age context, BMI summary, risk description
    /// - recommendations: BMI tips, first two posture tips, first hydration tip
    /// - preventive actions: BMI actions, first two activity actions
    /// - important flags: every matching combined-risk flag
    pub fn compose(&self, metrics: &DerivedMetrics) -> RecommendationDocument {
        let catalog = &self.catalog;
        let bmi = catalog.bmi(metrics.bmi_category);

        let summary = [
            catalog.age(metrics.age_group).summary.trim(),
            bmi.summary.trim(),
            catalog.risk(metrics.risk_level).summary.trim(),
        ]
        .join(" ");

        let recommendations: Vec<String> = bmi
            .recommendations
            .iter()
            .chain(
                catalog
                    .posture(metrics.posture_category)
                    .recommendations
                    .iter()
                    .take(POSTURE_TIPS),
            )
            .chain(
                catalog
                    .hydration(metrics.hydration_level)
                    .recommendations
                    .iter()
                    .take(1),
            )
            .filter(|tip| !tip.trim().is_empty())
            .cloned()
            .collect();

        let preventive_actions: Vec<String> = bmi
            .preventive_actions
            .iter()
            .chain(
                catalog
                    .activity(metrics.activity_level)
                    .preventive_actions
                    .iter()
                    .take(ACTIVITY_TIPS),
            )
            .filter(|tip| !tip.trim().is_empty())
            .cloned()
            .collect();

        let important_flags = CombinedRiskFlag::evaluate(metrics)
            .into_iter()
            .map(|flag| catalog.flag_text(flag).to_string())
            .collect();

        RecommendationDocument {
            summary,
            recommendations,
            risk_level: metrics.risk_level,
            preventive_actions,
            important_flags,
        }
    }
}
