// Core algorithm exports
pub mod compatibility;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod personality;
pub mod scoring;

pub use compatibility::{CompatibilityLevel, CompatibilityMatrix, MatrixError};
pub use distance::distance_km;
pub use filters::{is_eligible, matches_host_preferences, overlaps_schedule};
pub use matcher::{MatchResult, Matcher};
pub use personality::{PersonalityType, UnknownPersonalityType};
pub use scoring::{calculate_location_score, calculate_match_score, calculate_schedule_score};
