use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    FeedbackStats, MatchFeedback, MatchRequest, MatchStatus, NewFeedback, NewMatchRequest,
    PoolMember, RequestStats, UserProfile,
};

/// Errors that can occur in a match store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("User {0} already has an open match request")]
    DuplicateOpenRequest(String),

    #[error("Feedback already submitted by {reviewer} for request {request_id}")]
    DuplicateFeedback { request_id: Uuid, reviewer: String },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Which open requests may join a host's candidate pool
#[derive(Debug, Clone)]
pub struct PoolQuery {
    pub exhibition_id: String,
    pub exclude_user_id: String,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
}

/// Result of trying to pair a host request with a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Both requests are now `matched`; holds the host's request
    Paired(MatchRequest),
    /// The host's request was missing or no longer open
    RequestClosed,
    /// The candidate has no open request for the exhibition, is already
    /// paired for it, or was turned down on this request
    CandidateUnavailable,
}

/// Persistence seam of the matching service
///
/// Covers the profile store, the match-request store and the feedback store.
/// Implementations must make `insert_open_request`, `transition` and `pair`
/// atomic: two concurrent callers can never both succeed.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Insert a new `open` request unless the host already has one
    ///
    /// Fails with [`StoreError::DuplicateOpenRequest`] and writes nothing if
    /// an open request exists.
    async fn insert_open_request(&self, request: NewMatchRequest) -> Result<MatchRequest, StoreError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<MatchRequest>, StoreError>;

    /// Open requests for the exhibition in the date window, with profiles
    ///
    /// Requests whose owner has no profile, or who is already paired on a
    /// matched request for the same exhibition, are left out.
    async fn candidate_pool(&self, query: &PoolQuery) -> Result<Vec<PoolMember>, StoreError>;

    /// Compare-and-set `open` to `to`
    ///
    /// Returns the updated request, or `None` when the request was not open
    /// (or missing) at the time of the write. Pairing goes through `pair`.
    async fn transition(&self, id: Uuid, to: MatchStatus) -> Result<Option<MatchRequest>, StoreError>;

    /// Close the host's request and the candidate's open request for the
    /// same exhibition as one unit, each pointing at the other user
    async fn pair(&self, request_id: Uuid, candidate_user_id: &str) -> Result<PairOutcome, StoreError>;

    /// Record that the host turned down a candidate; repeat calls are no-ops
    async fn record_rejection(
        &self,
        request_id: Uuid,
        candidate_user_id: &str,
        rejecting_user_id: &str,
    ) -> Result<(), StoreError>;

    async fn rejected_candidates(&self, request_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Requests the user hosted or was matched into, newest first
    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<MatchStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MatchRequest>, StoreError>;

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<MatchFeedback, StoreError>;

    async fn request_stats(&self, user_id: &str) -> Result<RequestStats, StoreError>;

    async fn feedback_stats(&self, user_id: &str) -> Result<FeedbackStats, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
