//! PulseGuard - posture scoring and preventive health recommendations
//!
//! The library scores single frames of pose landmarks, derives health metrics
//! from four biometric inputs and turns those metrics into a five-section
//! recommendation, either from a rule catalog or from a generative model whose
//! output is validated before it is returned.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{derive_metrics, parse_document, score_posture, RuleCatalog, RuleComposer};
pub use crate::error::{PulseError, TimeoutCause};
pub use crate::models::{BiometricInput, DerivedMetrics, LandmarkSet, PostureResult, RecommendationDocument, Strategy};
pub use crate::services::{AiGenerator, CancelToken, HealthEngine, Recommendation};
