use crate::core::personality::PersonalityType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Part of the day a visit is planned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "time_slot", rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }

    /// Number of slots between `self` and `other` (0 = same, 1 = adjacent)
    pub fn gap(self, other: TimeSlot) -> u8 {
        (self as i8 - other as i8).unsigned_abs()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeSlot::Morning),
            "afternoon" => Ok(TimeSlot::Afternoon),
            "evening" => Ok(TimeSlot::Evening),
            other => Err(format!("time slot must be one of: morning, afternoon, evening (got {:?})", other)),
        }
    }
}

/// Lifecycle state of a match request
///
/// `Open` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum MatchStatus {
    Open,
    Matched,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::Matched => "matched",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(MatchStatus::Open),
            "matched" => Ok(MatchStatus::Matched),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("status must be one of: open, matched, cancelled (got {:?})", other)),
        }
    }
}

/// Inclusive companion age range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    #[inline]
    pub fn contains(&self, age: u8) -> bool {
        age >= self.min && age <= self.max
    }
}

/// Profile data the matcher reads for a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub personality_type: PersonalityType,
    pub location: GeoPoint,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// A user's invitation to be paired for one exhibition visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub id: Uuid,
    pub exhibition_id: String,
    pub host_user_id: String,
    pub preferred_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub max_distance_km: f64,
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub preferred_types: Vec<PersonalityType>,
    pub status: MatchStatus,
    pub matched_user_id: Option<String>,
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MatchRequest {
    pub fn is_open(&self) -> bool {
        self.status == MatchStatus::Open
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Validated data for a request about to be inserted
#[derive(Debug, Clone)]
pub struct NewMatchRequest {
    pub exhibition_id: String,
    pub host_user_id: String,
    pub preferred_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub max_distance_km: f64,
    pub age_range: Option<AgeRange>,
    pub preferred_types: Vec<PersonalityType>,
    pub expires_at: DateTime<Utc>,
}

/// Another user's open request that may pair with the host's, with its owner
#[derive(Debug, Clone)]
pub struct PoolMember {
    pub request: MatchRequest,
    pub profile: UserProfile,
}

/// Scored pairing result, computed on demand and never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub user_id: String,
    pub personality_type: PersonalityType,
    pub nickname: Option<String>,
    pub candidate_request_id: Uuid,
    pub distance_km: f64,
    pub compatibility_score: u8,
    pub location_score: f64,
    pub schedule_score: f64,
    pub match_score: f64,
}

/// Weights combining the partial scores into the match score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub compatibility: f64,
    pub location: f64,
    pub schedule: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            compatibility: 0.60,
            location: 0.25,
            schedule: 0.15,
        }
    }
}

/// Tunables for pool selection and result trimming
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingRules {
    /// Max days between the host's date and a candidate's date
    pub date_window_days: i64,
    /// Candidates scoring below this (after rounding) are dropped
    pub min_match_score: f64,
    /// Candidates whose type scores below this with the host are dropped
    pub min_compatibility: Option<u8>,
    pub max_results: usize,
}

impl Default for MatchingRules {
    fn default() -> Self {
        Self {
            date_window_days: 1,
            min_match_score: 1.0,
            min_compatibility: None,
            max_results: 20,
        }
    }
}

/// Recorded "not this one" decision by a host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub match_request_id: Uuid,
    pub candidate_user_id: String,
    pub rejecting_user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Rating left by one participant about the other after a match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFeedback {
    pub id: Uuid,
    pub match_request_id: Uuid,
    pub reviewer_user_id: String,
    pub target_user_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub match_request_id: Uuid,
    pub reviewer_user_id: String,
    pub target_user_id: String,
    pub rating: u8,
    pub comment: Option<String>,
}

/// Per-host request counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total_requests: i64,
    pub open_requests: i64,
    pub successful_matches: i64,
    pub cancelled_requests: i64,
    pub average_match_time_hours: Option<f64>,
}

/// Feedback received by a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub average_rating: Option<f64>,
}
