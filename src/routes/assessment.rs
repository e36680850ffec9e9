use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;

use crate::error::{ErrorKind, PulseError};
use crate::models::{
    BiometricRequest, ErrorResponse, HealthResponse, MetricsResponse, PostureResponse,
    RecommendRequest, RecommendationResponse, ScoreRequest, Strategy,
};
use crate::services::{CancelToken, HealthEngine};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<HealthEngine>,
}

/// Configure all assessment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/posture/score", web::post().to(score_posture))
        .route("/metrics", web::post().to(compute_metrics))
        .route("/recommendations", web::post().to(recommend));
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Map a core error onto an HTTP status and a JSON error body
pub fn error_response(err: &PulseError, request_id: String) -> HttpResponse {
    let (status, error) = match err.kind() {
        ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "invalid_input"),
        ErrorKind::InsufficientLandmarks => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_landmarks")
        }
        ErrorKind::MalformedResponse => (StatusCode::BAD_GATEWAY, "malformed_response"),
        ErrorKind::RetryableUpstream => (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable"),
        ErrorKind::GeneratorUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "generator_unavailable")
        }
        ErrorKind::TimedOut => (StatusCode::GATEWAY_TIMEOUT, "timed_out"),
        ErrorKind::Upstream => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
    };

    let message = match err.kind() {
        ErrorKind::Upstream => "Failed to generate health recommendations".to_string(),
        _ => err.to_string(),
    };

    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: error.to_string(),
        message,
        request_id,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generator_enabled: state.engine.generator_enabled(),
        timestamp: chrono::Utc::now(),
    })
}

/// Score a single frame of pose landmarks
///
/// POST /api/v1/posture/score
///
/// Request body:
/// ```json
/// { "landmarks": [{ "x": 0.5, "y": 0.2 }, ...] }
/// ```
async fn score_posture(
    state: web::Data<AppState>,
    req: web::Json<ScoreRequest>,
) -> impl Responder {
    let request_id = new_request_id();

    match state.engine.score(&req.landmark_set()) {
        Ok(result) => HttpResponse::Ok().json(PostureResponse {
            success: true,
            result,
            request_id,
        }),
        Err(e) => {
            tracing::info!(request_id = %request_id, "Posture scoring rejected: {}", e);
            error_response(&e, request_id)
        }
    }
}

/// Derive BMI, hydration and risk metrics
///
/// POST /api/v1/metrics
async fn compute_metrics(
    state: web::Data<AppState>,
    req: web::Json<BiometricRequest>,
) -> impl Responder {
    let request_id = new_request_id();

    match req.check() {
        Ok(input) => HttpResponse::Ok().json(MetricsResponse {
            success: true,
            metrics: state.engine.metrics(&input),
            request_id,
        }),
        Err(e) => {
            tracing::info!(request_id = %request_id, "Metrics request rejected: {}", e);
            error_response(&e, request_id)
        }
    }
}

/// Produce a five-section recommendation
///
/// POST /api/v1/recommendations
///
/// Request body:
/// ```json
/// {
///   "age": 28,
///   "weightKg": 75,
///   "heightCm": 175,
///   "activityLevel": "Lightly Active",
///   "postureScore": 65,
///   "strategy": "aiBacked",
///   "bmi": 24.5,
///   "fallbackToRules": true
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> impl Responder {
    let request_id = new_request_id();

    let input = match req.biometrics.check() {
        Ok(input) => input,
        Err(e) => {
            tracing::info!(request_id = %request_id, "Recommendation request rejected: {}", e);
            return error_response(&e, request_id);
        }
    };

    // Dropping this future on client disconnect also drops the generation call
    let cancel = CancelToken::new();
    let mut result = state
        .engine
        .recommend(&input, req.bmi, req.strategy, &cancel)
        .await;

    if let Err(e) = &result {
        if req.fallback_to_rules && req.strategy == Strategy::AiBacked {
            tracing::warn!(
                request_id = %request_id,
                "AI-backed generation failed ({}), falling back to rules",
                e
            );
            result = state
                .engine
                .recommend(&input, req.bmi, Strategy::RuleBased, &cancel)
                .await;
        }
    }

    match result {
        Ok(rec) => HttpResponse::Ok().json(RecommendationResponse {
            success: true,
            recommendations: rec.text,
            document: rec.document,
            urgency: rec.urgency,
            strategy: rec.strategy,
            metrics: rec.metrics,
            request_id,
            timestamp: chrono::Utc::now(),
        }),
        Err(e) => {
            tracing::error!(request_id = %request_id, "Recommendation failed: {}", e);
            error_response(&e, request_id)
        }
    }
}
