// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    landmark_index, ActivityLevel, AgeGroup, BiometricInput, BmiCategory, DerivedMetrics,
    HydrationLevel, Landmark, LandmarkSet, PostureCategory, PostureResult, PostureStatus,
    RecommendationDocument, RiskLevel, Strategy,
};
pub use requests::{BiometricRequest, RecommendRequest, ScoreRequest, WireNumber};
pub use responses::{ErrorResponse, HealthResponse, MetricsResponse, PostureResponse, RecommendationResponse};
