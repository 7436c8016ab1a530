use crate::core::{
    compatibility::CompatibilityMatrix,
    distance::distance_km,
    filters::is_eligible,
    scoring::{calculate_location_score, calculate_match_score, calculate_schedule_score},
};
use crate::models::{MatchCandidate, MatchRequest, MatchingRules, PoolMember, ScoringWeights, UserProfile};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<MatchCandidate>,
    pub total_candidates: usize,
}

/// Companion matching orchestrator
///
/// # Pipeline Stages
/// 1. Eligibility (exhibition, schedule overlap, host preferences, rejections)
/// 2. Scoring (compatibility, location, schedule)
/// 3. Cutoff (zero location, minimum score)
/// 4. Ranking and per-user de-duplication
#[derive(Debug, Clone)]
pub struct Matcher {
    matrix: Arc<CompatibilityMatrix>,
    weights: ScoringWeights,
    rules: MatchingRules,
}

impl Matcher {
    pub fn new(matrix: Arc<CompatibilityMatrix>, weights: ScoringWeights, rules: MatchingRules) -> Self {
        Self { matrix, weights, rules }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(CompatibilityMatrix::sayu()),
            ScoringWeights::default(),
            MatchingRules::default(),
        )
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    pub fn rules(&self) -> &MatchingRules {
        &self.rules
    }

    /// Score a single pool member against the host
    ///
    /// Returns `None` when the member is out of range or scores below the
    /// configured floor. Eligibility is not checked here.
    pub fn score_candidate(
        &self,
        host: &MatchRequest,
        host_profile: &UserProfile,
        member: &PoolMember,
    ) -> Option<MatchCandidate> {
        let compatibility_score = self
            .matrix
            .score(host_profile.personality_type, member.profile.personality_type);

        if let Some(floor) = self.rules.min_compatibility {
            if compatibility_score < floor {
                return None;
            }
        }

        let distance = distance_km(&host_profile.location, &member.profile.location);
        let location_score = calculate_location_score(distance, host.max_distance_km);
        if location_score <= 0.0 {
            return None;
        }

        let schedule_score = calculate_schedule_score(
            host.preferred_date,
            host.time_slot,
            member.request.preferred_date,
            member.request.time_slot,
        );

        let match_score = calculate_match_score(compatibility_score, location_score, schedule_score, &self.weights);
        if match_score <= 0.0 || match_score < self.rules.min_match_score {
            return None;
        }

        Some(MatchCandidate {
            user_id: member.profile.user_id.clone(),
            personality_type: member.profile.personality_type,
            nickname: member.profile.nickname.clone(),
            candidate_request_id: member.request.id,
            distance_km: distance,
            compatibility_score,
            location_score,
            schedule_score,
            match_score,
        })
    }

    /// Rank the pool for one open host request
    ///
    /// # Arguments
    /// * `host` - The host's open request
    /// * `host_profile` - Profile of the request's host
    /// * `pool` - Open requests that may pair with the host's
    /// * `rejected` - User ids the host has already turned down for this request
    /// * `now` - Reference time for expiry checks
    pub fn find_matches(
        &self,
        host: &MatchRequest,
        host_profile: &UserProfile,
        pool: Vec<PoolMember>,
        rejected: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let total_candidates = pool.len();

        let mut scored: Vec<MatchCandidate> = pool
            .iter()
            // Stage 1: eligibility
            .filter(|member| is_eligible(host, member, rejected, self.rules.date_window_days, now))
            // Stages 2 & 3: scoring and cutoff
            .filter_map(|member| self.score_candidate(host, host_profile, member))
            .collect();

        // Sort by score (descending), then distance (ascending), then id
        scored.sort_by(rank_order);

        // A user with several open requests is offered once, at their best
        let mut seen = HashSet::new();
        scored.retain(|candidate| seen.insert(candidate.user_id.clone()));

        scored.truncate(self.rules.max_results);

        MatchResult {
            matches: scored,
            total_candidates,
        }
    }
}

fn rank_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.match_score
        .partial_cmp(&a.match_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal))
        .then_with(|| a.user_id.cmp(&b.user_id))
        .then_with(|| a.candidate_request_id.cmp(&b.candidate_request_id))
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
