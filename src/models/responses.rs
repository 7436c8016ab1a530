use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::compatibility::CompatibilityLevel;
use crate::core::personality::PersonalityType;
use crate::models::domain::{FeedbackStats, MatchCandidate, MatchRequest, RequestStats};

/// Response for the find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchesResponse {
    pub match_request_id: Uuid,
    pub matches: Vec<MatchCandidate>,
    pub total: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchResponse {
    pub match_request: MatchRequest,
}

/// Result of a successful accept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub success: bool,
    pub match_id: Uuid,
}

/// Result of a successful reject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyMatchesResponse {
    pub matches: Vec<MatchRequest>,
    pub total: usize,
}

/// Aggregated request and feedback history of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingAnalytics {
    pub user_id: String,
    pub matching_stats: RequestStats,
    pub feedback_stats: FeedbackStats,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityResponse {
    pub user_type: PersonalityType,
    pub target_type: PersonalityType,
    pub compatibility_score: u8,
    pub compatibility_level: CompatibilityLevel,
}
