use crate::models::{ScoringWeights, TimeSlot};
use chrono::NaiveDate;

/// Location score at exactly `max_distance_km`
const LOCATION_SCORE_AT_CAP: f64 = 20.0;

/// Schedule score for the same date in an adjacent slot
const ADJACENT_SLOT_SCORE: f64 = 70.0;

/// Schedule points lost per day between the two dates
const SCHEDULE_PENALTY_PER_DAY: f64 = 15.0;

/// Calculate the location score (0-100) for a candidate `distance_km` away
///
/// Hard cutoff: anything beyond `max_distance_km` scores exactly 0. Within the
/// cap the score falls linearly from 100 at the host's doorstep to 20 at the
/// cap, so a closer candidate always outscores a farther one.
#[inline]
pub fn calculate_location_score(distance_km: f64, max_distance_km: f64) -> f64 {
    if !distance_km.is_finite() || !max_distance_km.is_finite() {
        return 0.0;
    }

    let distance = distance_km.max(0.0);
    if distance > max_distance_km {
        return 0.0;
    }
    if max_distance_km <= 0.0 {
        // Only reachable with distance == 0
        return 100.0;
    }

    100.0 - (100.0 - LOCATION_SCORE_AT_CAP) * (distance / max_distance_km)
}

/// Calculate how well two planned visits line up (0-100)
///
/// Same date and slot is a perfect 100, an adjacent slot 70; slots further
/// apart never overlap. Each day of difference costs 15 points.
pub fn calculate_schedule_score(
    host_date: NaiveDate,
    host_slot: TimeSlot,
    candidate_date: NaiveDate,
    candidate_slot: TimeSlot,
) -> f64 {
    let slot_score = match host_slot.gap(candidate_slot) {
        0 => 100.0,
        1 => ADJACENT_SLOT_SCORE,
        _ => return 0.0,
    };

    let days_apart = (candidate_date - host_date).num_days().abs() as f64;
    (slot_score - days_apart * SCHEDULE_PENALTY_PER_DAY).max(0.0)
}

/// Combine the partial scores into the final match score (0-100)
///
/// Scoring formula:
/// score = round(
///     (compatibility * w_c + location * w_l + schedule * w_s) / (w_c + w_l + w_s)
/// )
///
/// A zero location score short-circuits to zero: out-of-range candidates are
/// never rescued by a strong personality fit.
pub fn calculate_match_score(
    compatibility: u8,
    location_score: f64,
    schedule_score: f64,
    weights: &ScoringWeights,
) -> f64 {
    if location_score <= 0.0 {
        return 0.0;
    }

    let total_weight = weights.compatibility + weights.location + weights.schedule;
    if total_weight <= 0.0 {
        return 0.0;
    }

    let weighted = (compatibility as f64 * weights.compatibility
        + location_score * weights.location
        + schedule_score * weights.schedule)
        / total_weight;

    weighted.clamp(0.0, 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, day).unwrap()
    }

    #[test]
    fn test_location_score_monotonic() {
        let near = calculate_location_score(5.0, 50.0);
        let mid = calculate_location_score(20.0, 50.0);
        let far = calculate_location_score(40.0, 50.0);

        assert!(near > mid, "{} should beat {}", near, mid);
        assert!(mid > far, "{} should beat {}", mid, far);
    }

    #[test]
    fn test_location_score_hard_cutoff() {
        assert_eq!(calculate_location_score(60.0, 50.0), 0.0);
        assert_eq!(calculate_location_score(50.0001, 50.0), 0.0);
    }

    #[test]
    fn test_location_score_bounds() {
        assert_eq!(calculate_location_score(0.0, 50.0), 100.0);
        assert_eq!(calculate_location_score(50.0, 50.0), 20.0);
        assert_eq!(calculate_location_score(-3.0, 50.0), 100.0);
    }

    #[test]
    fn test_location_score_degenerate_inputs() {
        assert_eq!(calculate_location_score(f64::NAN, 50.0), 0.0);
        assert_eq!(calculate_location_score(1.0, 0.0), 0.0);
        assert_eq!(calculate_location_score(0.0, 0.0), 100.0);
    }

    #[test]
    fn test_location_score_strictly_decreasing_across_range() {
        let mut previous = f64::INFINITY;
        for step in 0..=50 {
            let score = calculate_location_score(step as f64, 50.0);
            assert!(score < previous);
            previous = score;
        }
    }

    #[test]
    fn test_schedule_score() {
        assert_eq!(calculate_schedule_score(date(1), TimeSlot::Morning, date(1), TimeSlot::Morning), 100.0);
        assert_eq!(calculate_schedule_score(date(1), TimeSlot::Morning, date(1), TimeSlot::Afternoon), 70.0);
        assert_eq!(calculate_schedule_score(date(1), TimeSlot::Morning, date(1), TimeSlot::Evening), 0.0);
        assert_eq!(calculate_schedule_score(date(1), TimeSlot::Evening, date(2), TimeSlot::Evening), 85.0);
        assert_eq!(calculate_schedule_score(date(3), TimeSlot::Evening, date(2), TimeSlot::Afternoon), 55.0);
    }

    #[test]
    fn test_match_score_is_weighted_average() {
        let weights = ScoringWeights::default();
        let score = calculate_match_score(100, 100.0, 100.0, &weights);
        assert_eq!(score, 100.0);

        let score = calculate_match_score(50, 100.0, 100.0, &weights);
        // 0.6*50 + 0.25*100 + 0.15*100 = 70
        assert_eq!(score, 70.0);
    }

    #[test]
    fn test_match_score_zero_when_out_of_range() {
        let weights = ScoringWeights::default();
        assert_eq!(calculate_match_score(100, 0.0, 100.0, &weights), 0.0);
    }

    #[test]
    fn test_match_score_clamped() {
        let weights = ScoringWeights {
            compatibility: 1.0,
            location: 1.0,
            schedule: 1.0,
        };
        let score = calculate_match_score(100, 100.0, 250.0, &weights);
        assert!(score <= 100.0);
    }
}
