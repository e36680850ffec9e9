// Core algorithm exports
pub mod catalog;
pub mod composer;
pub mod metrics;
pub mod parser;
pub mod posture;

pub use catalog::{CatalogError, CombinedRiskFlag, RuleCatalog, CATALOG_VERSION};
pub use composer::RuleComposer;
pub use metrics::{
    classify_age, classify_bmi, classify_posture, classify_risk, compute_bmi,
    compute_health_risk_score, compute_hydration, derive_metrics, reconcile_bmi, Hydration,
};
pub use parser::{parse_document, parse_sections, ParsedSections, Section};
pub use posture::{score_posture, PostureScorer, PostureThresholds};
