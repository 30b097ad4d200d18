// Route exports
pub mod discovery;
pub mod maintenance;
pub mod matches;

use crate::core::Engine;
use crate::error::EngineError;
use crate::models::ErrorResponse;
use actix_web::{web, HttpResponse};
use validator::ValidationErrors;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub default_limit: usize,
    pub sync_batch: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(discovery::configure)
            .configure(matches::configure)
            .configure(maintenance::configure),
    );
}

/// Map an engine failure to its HTTP status and JSON body
pub(crate) fn engine_error_response(err: &EngineError) -> HttpResponse {
    let body = ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        status_code: 0,
    };

    match err {
        EngineError::InvalidArgument(_) => HttpResponse::BadRequest().json(ErrorResponse {
            status_code: 400,
            ..body
        }),
        EngineError::Conflict(_) => HttpResponse::Conflict().json(ErrorResponse {
            status_code: 409,
            ..body
        }),
        EngineError::Unavailable(_) => {
            tracing::error!("Engine unavailable: {}", err);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                status_code: 503,
                ..body
            })
        }
    }
}

pub(crate) fn validation_error_response(errors: &ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}
