//! SAYU Match - exhibition companion matching service
//!
//! Pairs users who want to visit the same exhibition on roughly the same
//! date. Candidates are ranked by art-personality compatibility, distance
//! and schedule fit; hosts then accept or reject them.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{calculate_location_score, CompatibilityMatrix, Matcher, PersonalityType};
pub use models::{MatchCandidate, MatchRequest, MatchStatus, ScoringWeights, TimeSlot, UserProfile};
pub use services::{MatchStore, MatchingError, MatchingService, MemoryStore};
