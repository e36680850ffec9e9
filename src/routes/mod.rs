// Route exports
pub mod assessment;

use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::models::ErrorResponse;

pub use assessment::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(assessment::configure),
    );
}

/// Turn JSON payload errors into the standard error body
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        success: false,
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        request_id: uuid::Uuid::new_v4().to_string(),
    });
    error::InternalError::from_response(err, response).into()
}

/// JSON extractor config used by the server and the route tests
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(handle_json_payload_error)
}
