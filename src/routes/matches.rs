use crate::models::{CreateMatchRequest, ErrorResponse, RecordSwipeRequest, SwipeResponse};
use crate::routes::{engine_error_response, validation_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure swipe and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/swipes", web::post().to(record_swipe))
        .route("/matches", web::post().to(get_or_create_match))
        .route("/matches/{user_a}/{user_b}", web::get().to(get_match));
}

/// Record a swipe
///
/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// {
///   "actorId": "string",
///   "targetId": "string",
///   "liking": true,
///   "superLike": false
/// }
/// ```
async fn record_swipe(
    state: web::Data<AppState>,
    req: web::Json<RecordSwipeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error_response(&errors);
    }

    match state
        .engine
        .record_swipe(&req.actor_id, &req.target_id, req.liking, req.super_like)
        .await
    {
        Ok(outcome) => {
            if outcome.mutual {
                tracing::info!("Mutual like between {} and {}", req.actor_id, req.target_id);
            }
            HttpResponse::Ok().json(SwipeResponse::from(outcome))
        }
        Err(e) => {
            tracing::warn!("Swipe {} -> {} failed: {}", req.actor_id, req.target_id, e);
            engine_error_response(&e)
        }
    }
}

/// Fetch or create the match for a pair
///
/// POST /api/v1/matches
///
/// Responds 201 when the match was created by this call, 200 otherwise.
async fn get_or_create_match(
    state: web::Data<AppState>,
    req: web::Json<CreateMatchRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error_response(&errors);
    }

    match state.engine.get_or_create(&req.user_a, &req.user_b).await {
        Ok(creation) if creation.created => HttpResponse::Created().json(creation.m),
        Ok(creation) => HttpResponse::Ok().json(creation.m),
        Err(e) => engine_error_response(&e),
    }
}

/// GET /api/v1/matches/{userA}/{userB}
async fn get_match(state: web::Data<AppState>, path: web::Path<(String, String)>) -> impl Responder {
    let (user_a, user_b) = path.into_inner();

    match state.engine.get_match(&user_a, &user_b).await {
        Ok(Some(m)) => HttpResponse::Ok().json(m),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: "not_found".to_string(),
            message: format!("No match between {} and {}", user_a, user_b),
            status_code: 404,
        }),
        Err(e) => engine_error_response(&e),
    }
}
