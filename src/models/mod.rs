// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgeRange, FeedbackStats, GeoPoint, MatchCandidate, MatchFeedback, MatchRequest, MatchStatus,
    MatchingRules, NewFeedback, NewMatchRequest, PoolMember, Rejection, RequestStats,
    ScoringWeights, TimeSlot, UserProfile,
};
pub use requests::{
    ActingUserBody, CreateMatchBody, FeedbackBody, ListMatchesQuery, MatchData, MatchDecisionBody,
    UserQuery,
};
pub use responses::{
    AcceptResponse, CompatibilityResponse, CreateMatchResponse, ErrorResponse,
    FindMatchesResponse, HealthResponse, MatchingAnalytics, MyMatchesResponse, RejectResponse,
};
