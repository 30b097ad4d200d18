use crate::models::{HealthResponse, PurgeResponse, SyncResponse};
use crate::routes::{engine_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/maintenance/purge", web::post().to(purge_expired))
        .route("/maintenance/sync", web::post().to(sync_pending));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.engine.health_check().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        active_sessions: state.engine.session_stats().active_sessions,
    })
}

async fn purge_expired(state: web::Data<AppState>) -> impl Responder {
    match state.engine.purge_expired().await {
        Ok(report) => HttpResponse::Ok().json(PurgeResponse::from(report)),
        Err(e) => engine_error_response(&e),
    }
}

async fn sync_pending(state: web::Data<AppState>) -> impl Responder {
    match state.engine.sync_pending(state.sync_batch).await {
        Ok(report) => HttpResponse::Ok().json(SyncResponse::from(report)),
        Err(e) => engine_error_response(&e),
    }
}
