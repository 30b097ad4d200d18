use crate::models::{DiscoveryResponse, NextBatchRequest, ResetSessionRequest};
use crate::routes::{engine_error_response, validation_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use std::collections::HashSet;
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/discovery/next", web::post().to(next_batch))
        .route("/discovery/reset", web::post().to(reset_session));
}

/// Next discovery batch
///
/// POST /api/v1/discovery/next
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "preferences": {"genders": ["female"], "minAge": 21, "maxAge": 35, "maxDistanceKm": 50},
///   "location": {"latitude": 40.71, "longitude": -74.0},
///   "excludeUserIds": ["string"],
///   "limit": 20
/// }
/// ```
async fn next_batch(state: web::Data<AppState>, req: web::Json<NextBatchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for next_batch request: {:?}", errors);
        return validation_error_response(&errors);
    }

    let limit = req.limit.unwrap_or(state.default_limit);
    let exclude: HashSet<String> = req.exclude_user_ids.iter().cloned().collect();

    match state
        .engine
        .next_batch(&req.user_id, &req.preferences, req.location, &exclude, limit)
        .await
    {
        Ok(batch) => HttpResponse::Ok().json(DiscoveryResponse::from(batch)),
        Err(e) => {
            tracing::warn!("Discovery failed for {}: {}", req.user_id, e);
            engine_error_response(&e)
        }
    }
}

/// Forget what the current session already served
///
/// POST /api/v1/discovery/reset
async fn reset_session(
    state: web::Data<AppState>,
    req: web::Json<ResetSessionRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error_response(&errors);
    }

    state.engine.reset_session(&req.user_id).await;
    tracing::debug!("Reset discovery session for {}", req.user_id);

    HttpResponse::NoContent().finish()
}
