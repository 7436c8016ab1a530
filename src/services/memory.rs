use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    FeedbackStats, MatchFeedback, MatchRequest, MatchStatus, NewFeedback, NewMatchRequest,
    PoolMember, Rejection, RequestStats, UserProfile,
};
use crate::services::store::{MatchStore, PairOutcome, PoolQuery, StoreError};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<String, UserProfile>,
    requests: HashMap<Uuid, MatchRequest>,
    rejections: Vec<Rejection>,
    feedback: Vec<MatchFeedback>,
}

impl Tables {
    /// Whether the user is on either side of a matched request for the exhibition
    fn is_paired(&self, exhibition_id: &str, user_id: &str) -> bool {
        self.requests.values().any(|r| {
            r.status == MatchStatus::Matched
                && r.exhibition_id == exhibition_id
                && (r.host_user_id == user_id || r.matched_user_id.as_deref() == Some(user_id))
        })
    }

    fn is_rejected(&self, request_id: Uuid, candidate_user_id: &str) -> bool {
        self.rejections
            .iter()
            .any(|r| r.match_request_id == request_id && r.candidate_user_id == candidate_user_id)
    }
}

/// In-process match store
///
/// Every operation holds one lock for its whole duration, which gives the
/// check-then-write operations the same atomicity the Postgres backend gets
/// from its constraints.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with profiles
    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let tables = Tables {
            profiles: profiles.into_iter().map(|p| (p.user_id.clone(), p)).collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    /// Number of stored requests, regardless of status
    pub async fn request_count(&self) -> usize {
        self.tables.lock().await.requests.len()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.lock().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.tables
            .lock()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn insert_open_request(&self, request: NewMatchRequest) -> Result<MatchRequest, StoreError> {
        let mut tables = self.tables.lock().await;

        let has_open = tables
            .requests
            .values()
            .any(|r| r.host_user_id == request.host_user_id && r.is_open());
        if has_open {
            return Err(StoreError::DuplicateOpenRequest(request.host_user_id));
        }

        let created = MatchRequest {
            id: Uuid::new_v4(),
            exhibition_id: request.exhibition_id,
            host_user_id: request.host_user_id,
            preferred_date: request.preferred_date,
            time_slot: request.time_slot,
            max_distance_km: request.max_distance_km,
            age_range: request.age_range,
            preferred_types: request.preferred_types,
            status: MatchStatus::Open,
            matched_user_id: None,
            matched_at: None,
            created_at: Utc::now(),
            expires_at: request.expires_at,
        };
        tables.requests.insert(created.id, created.clone());

        Ok(created)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        Ok(self.tables.lock().await.requests.get(&id).cloned())
    }

    async fn candidate_pool(&self, query: &PoolQuery) -> Result<Vec<PoolMember>, StoreError> {
        let tables = self.tables.lock().await;

        let mut pool: Vec<PoolMember> = tables
            .requests
            .values()
            .filter(|r| {
                r.is_open()
                    && r.exhibition_id == query.exhibition_id
                    && r.host_user_id != query.exclude_user_id
                    && r.preferred_date >= query.earliest_date
                    && r.preferred_date <= query.latest_date
                    && !tables.is_paired(&r.exhibition_id, &r.host_user_id)
            })
            .filter_map(|r| {
                tables.profiles.get(&r.host_user_id).map(|profile| PoolMember {
                    request: r.clone(),
                    profile: profile.clone(),
                })
            })
            .collect();

        pool.sort_by(|a, b| a.request.created_at.cmp(&b.request.created_at));
        Ok(pool)
    }

    async fn transition(&self, id: Uuid, to: MatchStatus) -> Result<Option<MatchRequest>, StoreError> {
        let mut tables = self.tables.lock().await;

        let Some(request) = tables.requests.get_mut(&id) else {
            return Ok(None);
        };
        if !request.is_open() {
            return Ok(None);
        }

        request.status = to;

        Ok(Some(request.clone()))
    }

    async fn pair(&self, request_id: Uuid, candidate_user_id: &str) -> Result<PairOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let Some(host_request) = tables.requests.get(&request_id).filter(|r| r.is_open()) else {
            return Ok(PairOutcome::RequestClosed);
        };
        let exhibition_id = host_request.exhibition_id.clone();
        let host_user_id = host_request.host_user_id.clone();

        let candidate_request_id = tables
            .requests
            .values()
            .find(|r| {
                r.is_open()
                    && !r.is_expired(now)
                    && r.exhibition_id == exhibition_id
                    && r.host_user_id == candidate_user_id
            })
            .map(|r| r.id);
        let Some(candidate_request_id) = candidate_request_id else {
            return Ok(PairOutcome::CandidateUnavailable);
        };
        if tables.is_rejected(request_id, candidate_user_id) || tables.is_paired(&exhibition_id, candidate_user_id) {
            return Ok(PairOutcome::CandidateUnavailable);
        }

        let mut close = |id: Uuid, partner: &str| {
            tables.requests.get_mut(&id).map(|r| {
                r.status = MatchStatus::Matched;
                r.matched_user_id = Some(partner.to_string());
                r.matched_at = Some(now);
                r.clone()
            })
        };
        close(candidate_request_id, &host_user_id);
        match close(request_id, candidate_user_id) {
            Some(paired) => Ok(PairOutcome::Paired(paired)),
            None => Ok(PairOutcome::RequestClosed),
        }
    }

    async fn record_rejection(
        &self,
        request_id: Uuid,
        candidate_user_id: &str,
        rejecting_user_id: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;

        if !tables.is_rejected(request_id, candidate_user_id) {
            tables.rejections.push(Rejection {
                match_request_id: request_id,
                candidate_user_id: candidate_user_id.to_string(),
                rejecting_user_id: rejecting_user_id.to_string(),
                created_at: Utc::now(),
            });
        }

        Ok(())
    }

    async fn rejected_candidates(&self, request_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .rejections
            .iter()
            .filter(|r| r.match_request_id == request_id)
            .map(|r| r.candidate_user_id.clone())
            .collect())
    }

    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<MatchStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MatchRequest>, StoreError> {
        let tables = self.tables.lock().await;

        let mut requests: Vec<MatchRequest> = tables
            .requests
            .values()
            .filter(|r| r.host_user_id == user_id || r.matched_user_id.as_deref() == Some(user_id))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(requests.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<MatchFeedback, StoreError> {
        let mut tables = self.tables.lock().await;

        let exists = tables.feedback.iter().any(|f| {
            f.match_request_id == feedback.match_request_id && f.reviewer_user_id == feedback.reviewer_user_id
        });
        if exists {
            return Err(StoreError::DuplicateFeedback {
                request_id: feedback.match_request_id,
                reviewer: feedback.reviewer_user_id,
            });
        }

        let stored = MatchFeedback {
            id: Uuid::new_v4(),
            match_request_id: feedback.match_request_id,
            reviewer_user_id: feedback.reviewer_user_id,
            target_user_id: feedback.target_user_id,
            rating: feedback.rating,
            comment: feedback.comment,
            created_at: Utc::now(),
        };
        tables.feedback.push(stored.clone());

        Ok(stored)
    }

    async fn request_stats(&self, user_id: &str) -> Result<RequestStats, StoreError> {
        let tables = self.tables.lock().await;
        let hosted: Vec<&MatchRequest> = tables.requests.values().filter(|r| r.host_user_id == user_id).collect();

        let count = |status: MatchStatus| hosted.iter().filter(|r| r.status == status).count() as i64;

        let match_times: Vec<Duration> = hosted
            .iter()
            .filter(|r| r.status == MatchStatus::Matched)
            .filter_map(|r| r.matched_at.map(|at| at - r.created_at))
            .collect();
        let average_match_time_hours = if match_times.is_empty() {
            None
        } else {
            let total_secs: i64 = match_times.iter().map(|d| d.num_seconds()).sum();
            Some(total_secs as f64 / match_times.len() as f64 / 3600.0)
        };

        Ok(RequestStats {
            total_requests: hosted.len() as i64,
            open_requests: count(MatchStatus::Open),
            successful_matches: count(MatchStatus::Matched),
            cancelled_requests: count(MatchStatus::Cancelled),
            average_match_time_hours,
        })
    }

    async fn feedback_stats(&self, user_id: &str) -> Result<FeedbackStats, StoreError> {
        let tables = self.tables.lock().await;
        let ratings: Vec<u8> = tables
            .feedback
            .iter()
            .filter(|f| f.target_user_id == user_id)
            .map(|f| f.rating)
            .collect();

        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64)
        };

        Ok(FeedbackStats {
            total_feedback: ratings.len() as i64,
            average_rating,
        })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
