use std::sync::Arc;

use tracing::{debug, info};

use crate::core::catalog::RuleCatalog;
use crate::core::composer::RuleComposer;
use crate::core::metrics::{derive_metrics, reconcile_bmi};
use crate::core::posture::PostureScorer;
use crate::error::PulseError;
use crate::models::{
    BiometricInput, DerivedMetrics, LandmarkSet, PostureResult, RecommendationDocument, Strategy,
};
use crate::services::cancel::CancelToken;
use crate::services::generator::AiGenerator;

/// Recommendation produced by either strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub document: RecommendationDocument,
    /// Five-section text; the model's own wording for AI-backed results
    pub text: String,
    /// Urgency phrase for the document's risk level
    pub urgency: String,
    pub strategy: Strategy,
    pub metrics: DerivedMetrics,
}

/// Process-wide entry point for scoring and recommendations
///
/// Holds only immutable state and is shared across workers behind an `Arc`.
pub struct HealthEngine {
    composer: RuleComposer,
    scorer: PostureScorer,
    generator: Option<AiGenerator>,
}

impl HealthEngine {
    pub fn new(catalog: Arc<RuleCatalog>, scorer: PostureScorer) -> Self {
        Self {
            composer: RuleComposer::new(catalog),
            scorer,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: AiGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn generator_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.composer.catalog()
    }

    /// Score one frame of landmarks
    pub fn score(&self, landmarks: &LandmarkSet) -> Result<PostureResult, PulseError> {
        let result = self.scorer.score(landmarks)?;
        debug!(score = result.score, issues = result.issues.len(), "Posture scored");
        Ok(result)
    }

    pub fn metrics(&self, input: &BiometricInput) -> DerivedMetrics {
        derive_metrics(input)
    }

    /// Produce a recommendation with the requested strategy
    ///
    /// A supplied BMI is only compared against the recomputed one. The cancel
    /// token is only observed by the AI-backed strategy.
    pub async fn recommend(
        &self,
        input: &BiometricInput,
        supplied_bmi: Option<f64>,
        strategy: Strategy,
        cancel: &CancelToken,
    ) -> Result<Recommendation, PulseError> {
        let metrics = derive_metrics(input);
        reconcile_bmi(metrics.bmi, supplied_bmi);

        let (document, text) = match strategy {
            Strategy::RuleBased => {
                let document = self.composer.compose(&metrics);
                let text = document.to_string();
                (document, text)
            }
            Strategy::AiBacked => {
                let generator = self
                    .generator
                    .as_ref()
                    .ok_or(PulseError::GeneratorUnavailable)?;
                let generated = generator.generate(input, &metrics, cancel).await?;
                (generated.document, generated.text)
            }
        };

        info!(
            strategy = ?strategy,
            risk_level = %document.risk_level,
            flags = document.important_flags.len(),
            "Recommendation produced"
        );

        Ok(Recommendation {
            urgency: self.catalog().urgency(document.risk_level).to_string(),
            document,
            text,
            strategy,
            metrics,
        })
    }
}
