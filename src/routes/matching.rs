use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::PersonalityType;
use crate::models::{
    ActingUserBody, CreateMatchBody, CreateMatchResponse, ErrorResponse, FeedbackBody,
    FindMatchesResponse, HealthResponse, ListMatchesQuery, MatchCandidate, MatchDecisionBody,
    MatchStatus, MyMatchesResponse, UserQuery,
};
use crate::services::matching::first_violation;
use crate::services::{CacheKey, CacheManager, MatchingError, MatchingService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchingService>,
    pub cache: Arc<CacheManager>,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matching/exhibition", web::post().to(create_match_request))
        .route("/matching/exhibition/accept", web::post().to(accept_match))
        .route("/matching/exhibition/reject", web::post().to(reject_match))
        .route("/matching/exhibition/my-matches", web::get().to(my_matches))
        .route("/matching/exhibition/{id}/matches", web::get().to(find_matches))
        .route("/matching/exhibition/{id}/cancel", web::post().to(cancel_match_request))
        .route("/matching/exhibition/{id}/feedback", web::post().to(submit_feedback))
        .route("/matching/analytics", web::get().to(analytics))
        .route("/matching/compatibility/{user_type}/{target_type}", web::get().to(compatibility));
}

impl ResponseError for MatchingError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchingError::Validation { .. } => StatusCode::BAD_REQUEST,
            MatchingError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchingError::Unauthorized => StatusCode::FORBIDDEN,
            MatchingError::DuplicateRequest | MatchingError::Conflict(_) => StatusCode::CONFLICT,
            MatchingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            MatchingError::Store(e) => {
                tracing::error!("Store failure: {}", e);
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

fn validate<T: Validate>(body: &T) -> Result<(), MatchingError> {
    body.validate().map_err(|errors| first_violation(&errors))
}

/// Generation token under which an exhibition's rankings are cached
async fn exhibition_generation(cache: &CacheManager, exhibition_id: &str) -> String {
    let key = CacheKey::exhibition_generation(exhibition_id);
    if let Ok(generation) = cache.get_shared::<String>(&key).await {
        return generation;
    }

    let generation = Uuid::new_v4().to_string();
    if let Err(e) = cache.set(&key, &generation).await {
        tracing::warn!("Failed to store cache generation for {}: {}", exhibition_id, e);
    }
    generation
}

/// Orphan every cached ranking for the exhibition after its pool changed
async fn invalidate_exhibition(cache: &CacheManager, exhibition_id: &str) {
    let key = CacheKey::exhibition_generation(exhibition_id);
    if let Err(e) = cache.set(&key, &Uuid::new_v4().to_string()).await {
        tracing::warn!("Failed to invalidate cached matches for {}: {}", exhibition_id, e);
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = state.service.health_check().await;
    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Open a match request
///
/// POST /api/v1/matching/exhibition
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "exhibitionId": "string",
///   "preferredDate": "2025-03-01",
///   "timeSlot": "afternoon",
///   "maxDistance": 30,
///   "ageRange": { "min": 20, "max": 35 },
///   "preferredTypes": ["SREF"]
/// }
/// ```
async fn create_match_request(
    state: web::Data<AppState>,
    body: web::Json<CreateMatchBody>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*body)?;

    let match_request = state
        .service
        .create_match_request(&body.user_id, &body.match_data)
        .await?;
    invalidate_exhibition(&state.cache, &match_request.exhibition_id).await;

    Ok(HttpResponse::Created().json(CreateMatchResponse { match_request }))
}

/// Ranked candidates for a request
///
/// GET /api/v1/matching/exhibition/{id}/matches
async fn find_matches(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, MatchingError> {
    let match_request_id = path.into_inner();
    let request = state.service.get_match_request(match_request_id).await?;
    let generation = exhibition_generation(&state.cache, &request.exhibition_id).await;
    let cache_key = CacheKey::matches(match_request_id, &generation);

    if let Ok(cached) = state.cache.get::<Vec<MatchCandidate>>(&cache_key).await {
        tracing::debug!("Serving cached matches for {}", match_request_id);
        return Ok(HttpResponse::Ok().json(FindMatchesResponse {
            match_request_id,
            total: cached.len(),
            matches: cached,
        }));
    }

    let matches = state.service.find_compatible_matches(match_request_id).await?;

    if let Err(e) = state.cache.set(&cache_key, &matches).await {
        tracing::warn!("Failed to cache matches for {}: {}", match_request_id, e);
    }

    Ok(HttpResponse::Ok().json(FindMatchesResponse {
        match_request_id,
        total: matches.len(),
        matches,
    }))
}

/// POST /api/v1/matching/exhibition/accept
async fn accept_match(
    state: web::Data<AppState>,
    body: web::Json<MatchDecisionBody>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*body)?;
    let request = state.service.get_match_request(body.match_request_id).await?;

    let accepted = state
        .service
        .accept_match(request.id, &body.candidate_user_id, &body.user_id)
        .await?;
    invalidate_exhibition(&state.cache, &request.exhibition_id).await;

    Ok(HttpResponse::Ok().json(accepted))
}

/// POST /api/v1/matching/exhibition/reject
async fn reject_match(
    state: web::Data<AppState>,
    body: web::Json<MatchDecisionBody>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*body)?;
    let request = state.service.get_match_request(body.match_request_id).await?;

    let rejected = state
        .service
        .reject_match(request.id, &body.candidate_user_id, &body.user_id)
        .await?;
    invalidate_exhibition(&state.cache, &request.exhibition_id).await;

    Ok(HttpResponse::Ok().json(rejected))
}

/// POST /api/v1/matching/exhibition/{id}/cancel
async fn cancel_match_request(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ActingUserBody>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*body)?;
    let match_request_id = path.into_inner();

    let cancelled = state
        .service
        .cancel_match_request(match_request_id, &body.user_id)
        .await?;
    invalidate_exhibition(&state.cache, &cancelled.exhibition_id).await;

    Ok(HttpResponse::Ok().json(CreateMatchResponse {
        match_request: cancelled,
    }))
}

/// GET /api/v1/matching/exhibition/my-matches?userId=...&status=open
async fn my_matches(
    state: web::Data<AppState>,
    query: web::Query<ListMatchesQuery>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*query)?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<MatchStatus>().map_err(|message| MatchingError::Validation {
            field: "status".to_string(),
            message,
        })?),
        None => None,
    };

    let matches = state
        .service
        .list_match_requests(&query.user_id, status, query.limit as usize, query.offset as usize)
        .await?;

    Ok(HttpResponse::Ok().json(MyMatchesResponse {
        total: matches.len(),
        matches,
    }))
}

/// POST /api/v1/matching/exhibition/{id}/feedback
async fn submit_feedback(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<FeedbackBody>,
) -> Result<HttpResponse, MatchingError> {
    validate(&*body)?;
    let body = body.into_inner();

    let feedback = state
        .service
        .submit_feedback(path.into_inner(), &body.user_id, body.rating, body.comment)
        .await?;

    Ok(HttpResponse::Created().json(feedback))
}

/// GET /api/v1/matching/analytics?userId=...
async fn analytics(state: web::Data<AppState>, query: web::Query<UserQuery>) -> Result<HttpResponse, MatchingError> {
    validate(&*query)?;
    let analytics = state.service.get_matching_analytics(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(analytics))
}

/// GET /api/v1/matching/compatibility/{userType}/{targetType}
async fn compatibility(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, MatchingError> {
    let (user_type, target_type) = path.into_inner();
    let parse = |field: &str, raw: &str| {
        raw.parse::<PersonalityType>().map_err(|e| MatchingError::Validation {
            field: field.to_string(),
            message: e.to_string(),
        })
    };

    let response = state
        .service
        .personality_compatibility(parse("userType", &user_type)?, parse("targetType", &target_type)?);

    Ok(HttpResponse::Ok().json(response))
}
