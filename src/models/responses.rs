use serde::{Deserialize, Serialize};

use crate::models::domain::{DerivedMetrics, PostureResult, RecommendationDocument, Strategy};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub generator_enabled: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub request_id: String,
}

/// Posture scoring response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: PostureResult,
    pub request_id: String,
}

/// Derived metrics response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub success: bool,
    pub metrics: DerivedMetrics,
    pub request_id: String,
}

/// Recommendations response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub success: bool,
    /// Five-section text, as produced by the chosen strategy
    pub recommendations: String,
    pub document: RecommendationDocument,
    pub urgency: String,
    pub strategy: Strategy,
    pub metrics: DerivedMetrics,
    pub request_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
