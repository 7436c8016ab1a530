use crate::models::{MatchRequest, PoolMember, UserProfile};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Check if a candidate's request lines up with the host's visit
///
/// Dates must be at most `window_days` apart and the slots equal or adjacent.
#[inline]
pub fn overlaps_schedule(host: &MatchRequest, candidate: &MatchRequest, window_days: i64) -> bool {
    let days_apart = (candidate.preferred_date - host.preferred_date).num_days().abs();
    days_apart <= window_days && host.time_slot.gap(candidate.time_slot) <= 1
}

/// Check a candidate profile against the host's optional preferences
///
/// An unknown candidate age passes the age filter.
#[inline]
pub fn matches_host_preferences(host: &MatchRequest, profile: &UserProfile) -> bool {
    if !host.preferred_types.is_empty() && !host.preferred_types.contains(&profile.personality_type) {
        return false;
    }

    match (host.age_range, profile.age) {
        (Some(range), Some(age)) => range.contains(age),
        _ => true,
    }
}

/// Check if a pool member may be offered to the host at all
///
/// This is Stage 1 of the pipeline: hard eligibility, no scoring.
pub fn is_eligible(
    host: &MatchRequest,
    member: &PoolMember,
    rejected: &HashSet<String>,
    window_days: i64,
    now: DateTime<Utc>,
) -> bool {
    let candidate = &member.request;

    if candidate.host_user_id == host.host_user_id || member.profile.user_id == host.host_user_id {
        return false;
    }

    if candidate.exhibition_id != host.exhibition_id || !candidate.is_open() || candidate.is_expired(now) {
        return false;
    }

    if rejected.contains(&member.profile.user_id) {
        return false;
    }

    overlaps_schedule(host, candidate, window_days) && matches_host_preferences(host, &member.profile)
}
