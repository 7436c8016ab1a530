use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::core::{CompatibilityLevel, Matcher, PersonalityType};
use crate::models::{
    AcceptResponse, AgeRange, CompatibilityResponse, MatchCandidate, MatchData, MatchFeedback,
    MatchRequest, MatchStatus, MatchingAnalytics, NewFeedback, NewMatchRequest, RejectResponse,
    TimeSlot,
};
use crate::services::store::{MatchStore, PairOutcome, PoolQuery, StoreError};

const MIN_COMPANION_AGE: u8 = 18;
const MAX_COMPANION_AGE: u8 = 120;

/// Errors surfaced by matching operations
///
/// Each variant maps to a distinct caller-facing message and status code.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("You already have an open match request")]
    DuplicateRequest,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized to act on this match request")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl MatchingError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        MatchingError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            MatchingError::Validation { .. } => "validation_error",
            MatchingError::DuplicateRequest => "duplicate_request",
            MatchingError::NotFound(_) => "not_found",
            MatchingError::Unauthorized => "unauthorized",
            MatchingError::Conflict(_) => "conflict",
            MatchingError::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for MatchingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateOpenRequest(_) => MatchingError::DuplicateRequest,
            StoreError::DuplicateFeedback { .. } => {
                MatchingError::Conflict("feedback already submitted for this match".to_string())
            }
            other => MatchingError::Store(other),
        }
    }
}

/// Values applied when a request leaves them out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    pub max_distance_km: f64,
    pub request_ttl_days: i64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            max_distance_km: 50.0,
            request_ttl_days: 7,
        }
    }
}

/// Exhibition companion matching operations
///
/// Stateless apart from its collaborators; clone the `Arc`s freely.
#[derive(Clone)]
pub struct MatchingService {
    store: Arc<dyn MatchStore>,
    matcher: Matcher,
    defaults: RequestDefaults,
}

impl MatchingService {
    pub fn new(store: Arc<dyn MatchStore>, matcher: Matcher, defaults: RequestDefaults) -> Self {
        Self {
            store,
            matcher,
            defaults,
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    /// Open a new match request for `user_id`
    ///
    /// The duplicate check is the store's atomic insert: a user with an open
    /// request gets [`MatchingError::DuplicateRequest`] and nothing is written.
    pub async fn create_match_request(&self, user_id: &str, data: &MatchData) -> Result<MatchRequest, MatchingError> {
        if user_id.trim().is_empty() {
            return Err(MatchingError::validation("userId", "userId is required"));
        }
        let new_request = self.parse_match_data(user_id, data)?;

        if self.store.get_profile(user_id).await?.is_none() {
            return Err(MatchingError::NotFound(format!("profile for user {}", user_id)));
        }

        let created = self.store.insert_open_request(new_request).await.map_err(|e| {
            if matches!(e, StoreError::DuplicateOpenRequest(_)) {
                tracing::info!("Rejected duplicate open request for {}", user_id);
            }
            MatchingError::from(e)
        })?;

        tracing::info!(
            "Created match request {} for {} (exhibition {}, {} {})",
            created.id,
            user_id,
            created.exhibition_id,
            created.preferred_date,
            created.time_slot
        );

        Ok(created)
    }

    fn parse_match_data(&self, user_id: &str, data: &MatchData) -> Result<NewMatchRequest, MatchingError> {
        data.validate().map_err(|errors| first_violation(&errors))?;

        let preferred_date = NaiveDate::parse_from_str(data.preferred_date.trim(), "%Y-%m-%d")
            .map_err(|_| MatchingError::validation("preferredDate", "preferredDate must be an ISO date (YYYY-MM-DD)"))?;
        let today = Utc::now().date_naive();
        if preferred_date < today {
            return Err(MatchingError::validation(
                "preferredDate",
                format!("preferredDate {} is in the past", preferred_date),
            ));
        }

        let time_slot: TimeSlot = data
            .time_slot
            .parse()
            .map_err(|message: String| MatchingError::validation("timeSlot", message))?;

        if let Some(range) = data.age_range {
            validate_age_range(range)?;
        }

        let mut preferred_types = Vec::with_capacity(data.preferred_types.len());
        for raw in &data.preferred_types {
            let parsed: PersonalityType = raw
                .parse()
                .map_err(|e: crate::core::UnknownPersonalityType| MatchingError::validation("preferredTypes", e.to_string()))?;
            if !preferred_types.contains(&parsed) {
                preferred_types.push(parsed);
            }
        }

        Ok(NewMatchRequest {
            exhibition_id: data.exhibition_id.trim().to_string(),
            host_user_id: user_id.to_string(),
            preferred_date,
            time_slot,
            max_distance_km: data.max_distance.unwrap_or(self.defaults.max_distance_km),
            age_range: data.age_range,
            preferred_types,
            expires_at: Utc::now() + Duration::days(self.defaults.request_ttl_days),
        })
    }

    /// Rank compatible companions for an open request
    ///
    /// A request that is no longer open, or has expired, has nobody left to
    /// match and yields an empty list.
    pub async fn find_compatible_matches(&self, match_request_id: Uuid) -> Result<Vec<MatchCandidate>, MatchingError> {
        let request = self.load_request(match_request_id).await?;
        let now = Utc::now();
        if !request.is_open() {
            tracing::debug!("Match request {} is {}, no candidates", request.id, request.status);
            return Ok(vec![]);
        }
        if request.is_expired(now) {
            tracing::debug!("Match request {} expired at {}, no candidates", request.id, request.expires_at);
            return Ok(vec![]);
        }

        let host_profile = self
            .store
            .get_profile(&request.host_user_id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("profile for user {}", request.host_user_id)))?;

        let window = Duration::days(self.matcher.rules().date_window_days);
        let query = PoolQuery {
            exhibition_id: request.exhibition_id.clone(),
            exclude_user_id: request.host_user_id.clone(),
            earliest_date: request.preferred_date - window,
            latest_date: request.preferred_date + window,
        };

        let pool = self.store.candidate_pool(&query).await?;
        let rejected: HashSet<String> = self.store.rejected_candidates(request.id).await?.into_iter().collect();

        let result = self
            .matcher
            .find_matches(&request, &host_profile, pool, &rejected, now);

        tracing::info!(
            "Returning {} matches for request {} (from {} pool entries)",
            result.matches.len(),
            request.id,
            result.total_candidates
        );

        Ok(result.matches)
    }

    /// Pair the host with `candidate_user_id`
    ///
    /// The candidate must still be available: an open request of their own for
    /// the exhibition, not already paired for it, and not turned down on this
    /// request. Both requests close together.
    pub async fn accept_match(
        &self,
        match_request_id: Uuid,
        candidate_user_id: &str,
        host_user_id: &str,
    ) -> Result<AcceptResponse, MatchingError> {
        let request = self.load_request(match_request_id).await?;
        ensure_decidable(&request, candidate_user_id, host_user_id)?;
        if request.is_expired(Utc::now()) {
            return Err(MatchingError::Conflict(format!("match request {} has expired", request.id)));
        }

        if self.store.get_profile(candidate_user_id).await?.is_none() {
            return Err(MatchingError::NotFound(format!("profile for user {}", candidate_user_id)));
        }

        let matched = match self.store.pair(request.id, candidate_user_id).await? {
            PairOutcome::Paired(matched) => matched,
            PairOutcome::RequestClosed => {
                return Err(MatchingError::Conflict(format!("match request {} is no longer open", request.id)));
            }
            PairOutcome::CandidateUnavailable => {
                return Err(MatchingError::Conflict(format!(
                    "user {} is not available for exhibition {}",
                    candidate_user_id, request.exhibition_id
                )));
            }
        };

        tracing::info!(
            "Match request {} accepted: {} paired with {}",
            matched.id,
            host_user_id,
            candidate_user_id
        );

        Ok(AcceptResponse {
            success: true,
            match_id: matched.id,
        })
    }

    /// Turn down a candidate; the request stays open for others
    pub async fn reject_match(
        &self,
        match_request_id: Uuid,
        candidate_user_id: &str,
        host_user_id: &str,
    ) -> Result<RejectResponse, MatchingError> {
        let request = self.load_request(match_request_id).await?;
        ensure_decidable(&request, candidate_user_id, host_user_id)?;

        self.store
            .record_rejection(request.id, candidate_user_id, host_user_id)
            .await?;

        tracing::debug!("Match request {}: {} rejected {}", request.id, host_user_id, candidate_user_id);

        Ok(RejectResponse { success: true })
    }

    /// Withdraw an open request
    pub async fn cancel_match_request(
        &self,
        match_request_id: Uuid,
        host_user_id: &str,
    ) -> Result<MatchRequest, MatchingError> {
        let request = self.load_request(match_request_id).await?;
        if request.host_user_id != host_user_id {
            return Err(MatchingError::Unauthorized);
        }
        if !request.is_open() {
            return Err(MatchingError::Conflict(format!("match request {} is already {}", request.id, request.status)));
        }

        let cancelled = self
            .store
            .transition(request.id, MatchStatus::Cancelled)
            .await?
            .ok_or_else(|| MatchingError::Conflict(format!("match request {} is no longer open", request.id)))?;

        tracing::info!("Match request {} cancelled by {}", cancelled.id, host_user_id);
        Ok(cancelled)
    }

    /// Requests the user hosted or joined, newest first
    pub async fn list_match_requests(
        &self,
        user_id: &str,
        status: Option<MatchStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MatchRequest>, MatchingError> {
        Ok(self.store.list_requests(user_id, status, limit.min(100), offset).await?)
    }

    /// Rate the companion of a completed match
    pub async fn submit_feedback(
        &self,
        match_request_id: Uuid,
        reviewer_user_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<MatchFeedback, MatchingError> {
        if !(1..=5).contains(&rating) {
            return Err(MatchingError::validation("rating", "rating must be between 1 and 5"));
        }

        let request = self.load_request(match_request_id).await?;
        if request.status != MatchStatus::Matched {
            return Err(MatchingError::Conflict(format!(
                "feedback needs a matched request, {} is {}",
                request.id, request.status
            )));
        }

        let target_user_id = match request.matched_user_id.as_deref() {
            Some(matched) if reviewer_user_id == request.host_user_id => matched.to_string(),
            Some(matched) if reviewer_user_id == matched => request.host_user_id.clone(),
            _ => return Err(MatchingError::Unauthorized),
        };

        let feedback = self
            .store
            .insert_feedback(NewFeedback {
                match_request_id: request.id,
                reviewer_user_id: reviewer_user_id.to_string(),
                target_user_id,
                rating,
                comment: comment.filter(|c| !c.trim().is_empty()),
            })
            .await?;

        tracing::debug!("Feedback {} recorded for request {}", feedback.id, request.id);
        Ok(feedback)
    }

    /// Request and feedback history of a user
    pub async fn get_matching_analytics(&self, user_id: &str) -> Result<MatchingAnalytics, MatchingError> {
        let matching_stats = self.store.request_stats(user_id).await?;
        let feedback_stats = self.store.feedback_stats(user_id).await?;

        let success_rate = if matching_stats.total_requests > 0 {
            matching_stats.successful_matches as f64 / matching_stats.total_requests as f64
        } else {
            0.0
        };

        Ok(MatchingAnalytics {
            user_id: user_id.to_string(),
            matching_stats,
            feedback_stats,
            success_rate,
        })
    }

    /// Compatibility between two personality types
    pub fn personality_compatibility(&self, user_type: PersonalityType, target_type: PersonalityType) -> CompatibilityResponse {
        let score = self.matcher.matrix().score(user_type, target_type);
        CompatibilityResponse {
            user_type,
            target_type,
            compatibility_score: score,
            compatibility_level: CompatibilityLevel::from_score(score),
        }
    }

    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }

    pub async fn get_match_request(&self, match_request_id: Uuid) -> Result<MatchRequest, MatchingError> {
        self.load_request(match_request_id).await
    }

    async fn load_request(&self, id: Uuid) -> Result<MatchRequest, MatchingError> {
        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| MatchingError::NotFound(format!("match request {}", id)))
    }
}

/// Shared preconditions of accept and reject
fn ensure_decidable(request: &MatchRequest, candidate_user_id: &str, host_user_id: &str) -> Result<(), MatchingError> {
    if request.host_user_id != host_user_id {
        return Err(MatchingError::Unauthorized);
    }
    if candidate_user_id.trim().is_empty() || candidate_user_id == request.host_user_id {
        return Err(MatchingError::validation("candidateUserId", "candidate must be another user"));
    }
    if !request.is_open() {
        return Err(MatchingError::Conflict(format!("match request {} is already {}", request.id, request.status)));
    }
    Ok(())
}

fn validate_age_range(range: AgeRange) -> Result<(), MatchingError> {
    if range.min < MIN_COMPANION_AGE || range.max > MAX_COMPANION_AGE || range.min > range.max {
        return Err(MatchingError::validation(
            "ageRange",
            format!(
                "ageRange must satisfy {} <= min <= max <= {}",
                MIN_COMPANION_AGE, MAX_COMPANION_AGE
            ),
        ));
    }
    Ok(())
}

/// Report the first failing field (alphabetically, for stable messages)
pub(crate) fn first_violation(errors: &ValidationErrors) -> MatchingError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, errs)) => {
            let field = camel_case(field);
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", field));
            MatchingError::Validation { field, message }
        }
        None => MatchingError::validation("matchData", errors.to_string()),
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
