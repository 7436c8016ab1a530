// Integration tests for SAYU Match

use chrono::{Duration, Utc};
use sayu_match::core::{Matcher, PersonalityType};
use sayu_match::models::{AgeRange, GeoPoint, MatchData, MatchStatus, UserProfile};
use sayu_match::services::{MatchStore, MatchingError, MatchingService, MemoryStore, RequestDefaults};
use std::sync::Arc;
use uuid::Uuid;

// One degree of latitude is ~111.2 km
const KM_PER_DEGREE_LAT: f64 = 111.195;
const SEOUL: GeoPoint = GeoPoint { lat: 37.5665, lon: 126.9780 };

fn north_of_seoul(km: f64) -> GeoPoint {
    GeoPoint {
        lat: SEOUL.lat + km / KM_PER_DEGREE_LAT,
        lon: SEOUL.lon,
    }
}

fn create_test_profile(user_id: &str, personality_type: PersonalityType, location: GeoPoint) -> UserProfile {
    UserProfile {
        user_id: user_id.to_string(),
        personality_type,
        location,
        age: Some(29),
        nickname: Some(format!("{} nick", user_id)),
    }
}

fn visit_date(days_ahead: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days_ahead))
        .format("%Y-%m-%d")
        .to_string()
}

fn match_data(exhibition_id: &str) -> MatchData {
    MatchData {
        exhibition_id: exhibition_id.to_string(),
        preferred_date: visit_date(14),
        time_slot: "afternoon".to_string(),
        ..Default::default()
    }
}

fn setup(profiles: Vec<UserProfile>) -> (Arc<MemoryStore>, MatchingService) {
    let store = Arc::new(MemoryStore::with_profiles(profiles));
    let service = MatchingService::new(
        store.clone() as Arc<dyn MatchStore>,
        Matcher::with_defaults(),
        RequestDefaults::default(),
    );
    (store, service)
}

/// Host LAEF in Seoul plus SREF at 5 km, SAEC at 20 km and LRMC at 60 km
async fn reference_world() -> (Arc<MemoryStore>, MatchingService, Uuid) {
    let (store, service) = setup(vec![
        create_test_profile("host", PersonalityType::Laef, SEOUL),
        create_test_profile("sref", PersonalityType::Sref, north_of_seoul(5.0)),
        create_test_profile("saec", PersonalityType::Saec, north_of_seoul(20.0)),
        create_test_profile("lrmc", PersonalityType::Lrmc, north_of_seoul(60.0)),
    ]);

    let host_request = service.create_match_request("host", &match_data("ex-1")).await.unwrap();
    for user in ["sref", "saec", "lrmc"] {
        service.create_match_request(user, &match_data("ex-1")).await.unwrap();
    }

    (store, service, host_request.id)
}

#[tokio::test]
async fn test_create_defaults_and_duplicate() {
    let (store, service) = setup(vec![create_test_profile("host", PersonalityType::Laef, SEOUL)]);

    let created = service.create_match_request("host", &match_data("ex-1")).await.unwrap();
    assert_eq!(created.status, MatchStatus::Open);
    assert_eq!(created.max_distance_km, 50.0);
    assert!(created.expires_at > created.created_at);

    let err = service.create_match_request("host", &match_data("ex-2")).await.unwrap_err();
    assert!(matches!(err, MatchingError::DuplicateRequest));
    assert_eq!(err.to_string(), "You already have an open match request");
    assert_eq!(store.request_count().await, 1);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (_store, service) = setup(vec![create_test_profile("host", PersonalityType::Laef, SEOUL)]);

    let field_of = |err: MatchingError| match err {
        MatchingError::Validation { field, .. } => field,
        other => panic!("expected validation error, got {:?}", other),
    };

    let mut past = match_data("ex-1");
    past.preferred_date = visit_date(-1);
    let err = service.create_match_request("host", &past).await.unwrap_err();
    assert_eq!(field_of(err), "preferredDate");

    let mut garbled = match_data("ex-1");
    garbled.preferred_date = "next tuesday".to_string();
    let err = service.create_match_request("host", &garbled).await.unwrap_err();
    assert_eq!(field_of(err), "preferredDate");

    let mut bad_slot = match_data("ex-1");
    bad_slot.time_slot = "midnight".to_string();
    let err = service.create_match_request("host", &bad_slot).await.unwrap_err();
    assert_eq!(field_of(err), "timeSlot");

    let mut bad_distance = match_data("ex-1");
    bad_distance.max_distance = Some(0.0);
    let err = service.create_match_request("host", &bad_distance).await.unwrap_err();
    assert_eq!(field_of(err), "maxDistance");

    let mut bad_ages = match_data("ex-1");
    bad_ages.age_range = Some(AgeRange { min: 40, max: 30 });
    let err = service.create_match_request("host", &bad_ages).await.unwrap_err();
    assert_eq!(field_of(err), "ageRange");

    let mut bad_type = match_data("ex-1");
    bad_type.preferred_types = vec!["XXXX".to_string()];
    let err = service.create_match_request("host", &bad_type).await.unwrap_err();
    assert_eq!(field_of(err), "preferredTypes");

    let missing_exhibition = match_data("");
    let err = service.create_match_request("host", &missing_exhibition).await.unwrap_err();
    assert_eq!(field_of(err), "exhibitionId");

    // nothing was written by the failed attempts
    assert!(service.create_match_request("host", &match_data("ex-1")).await.is_ok());
}

#[tokio::test]
async fn test_create_requires_profile() {
    let (store, service) = setup(vec![]);

    let err = service.create_match_request("ghost", &match_data("ex-1")).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound(_)));
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_allows_one_open_request() {
    let (store, service) = setup(vec![create_test_profile("host", PersonalityType::Laef, SEOUL)]);
    let service = Arc::new(service);

    let a = service.clone();
    let b = service.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.create_match_request("host", &match_data("ex-1")).await }),
        tokio::spawn(async move { b.create_match_request("host", &match_data("ex-1")).await }),
    );
    let results = [first.unwrap(), second.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(MatchingError::DuplicateRequest))));
    assert_eq!(store.request_count().await, 1);
}

#[tokio::test]
async fn test_reference_scenario() {
    let (_store, service, host_request_id) = reference_world().await;

    let matches = service.find_compatible_matches(host_request_id).await.unwrap();

    let users: Vec<&str> = matches.iter().map(|m| m.user_id.as_str()).collect();
    assert_eq!(users, vec!["sref", "saec"]);
    assert!(matches[0].distance_km < matches[1].distance_km);
}

#[tokio::test]
async fn test_ranking_bounds_across_all_types() {
    let mut profiles = vec![create_test_profile("host", PersonalityType::Samc, SEOUL)];
    for (i, personality_type) in PersonalityType::ALL.iter().enumerate() {
        profiles.push(create_test_profile(
            &format!("user-{}", i),
            *personality_type,
            north_of_seoul(i as f64 * 3.0),
        ));
    }
    let (_store, service) = setup(profiles);

    let host_request = service.create_match_request("host", &match_data("ex-1")).await.unwrap();
    for i in 0..PersonalityType::ALL.len() {
        service
            .create_match_request(&format!("user-{}", i), &match_data("ex-1"))
            .await
            .unwrap();
    }

    let matches = service.find_compatible_matches(host_request.id).await.unwrap();

    assert!(!matches.is_empty());
    assert!(matches.len() <= 20);
    for m in &matches {
        assert!(m.match_score > 0.0 && m.match_score <= 100.0);
        assert!(m.distance_km <= 50.0);
        assert_ne!(m.user_id, "host");
    }
    for pair in matches.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
}

#[tokio::test]
async fn test_other_exhibitions_and_far_dates_excluded() {
    let (_store, service) = setup(vec![
        create_test_profile("host", PersonalityType::Laef, SEOUL),
        create_test_profile("elsewhere", PersonalityType::Sref, north_of_seoul(2.0)),
        create_test_profile("later", PersonalityType::Sref, north_of_seoul(2.0)),
    ]);

    let host_request = service.create_match_request("host", &match_data("ex-1")).await.unwrap();
    service
        .create_match_request("elsewhere", &match_data("ex-2"))
        .await
        .unwrap();
    let mut later = match_data("ex-1");
    later.preferred_date = visit_date(30);
    service.create_match_request("later", &later).await.unwrap();

    let matches = service.find_compatible_matches(host_request.id).await.unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_find_unknown_request() {
    let (_store, service) = setup(vec![]);
    let err = service.find_compatible_matches(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound(_)));
}

#[tokio::test]
async fn test_accept_pairs_and_closes_request() {
    let (store, service, host_request_id) = reference_world().await;

    let accepted = service.accept_match(host_request_id, "sref", "host").await.unwrap();
    assert!(accepted.success);
    assert_eq!(accepted.match_id, host_request_id);

    let stored = store.get_request(host_request_id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Matched);
    assert_eq!(stored.matched_user_id.as_deref(), Some("sref"));
    assert!(stored.matched_at.is_some());

    // a closed request has nobody left to match and cannot be decided again
    assert!(service.find_compatible_matches(host_request_id).await.unwrap().is_empty());
    let err = service.accept_match(host_request_id, "saec", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accept_has_single_winner() {
    let (store, service, host_request_id) = reference_world().await;
    let service = Arc::new(service);

    let a = service.clone();
    let b = service.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.accept_match(host_request_id, "sref", "host").await }),
        tokio::spawn(async move { b.accept_match(host_request_id, "saec", "host").await }),
    );
    let results = [first.unwrap(), second.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(MatchingError::Conflict(_)))));

    let stored = store.get_request(host_request_id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Matched);
    assert!(matches!(stored.matched_user_id.as_deref(), Some("sref") | Some("saec")));
}

#[tokio::test]
async fn test_decisions_require_host() {
    let (_store, service, host_request_id) = reference_world().await;

    let err = service.accept_match(host_request_id, "saec", "sref").await.unwrap_err();
    assert!(matches!(err, MatchingError::Unauthorized));

    let err = service.reject_match(host_request_id, "saec", "sref").await.unwrap_err();
    assert!(matches!(err, MatchingError::Unauthorized));

    let err = service.cancel_match_request(host_request_id, "sref").await.unwrap_err();
    assert!(matches!(err, MatchingError::Unauthorized));

    let err = service.accept_match(host_request_id, "host", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { .. }));

    let err = service.accept_match(host_request_id, "nobody", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound(_)));

    let err = service.accept_match(Uuid::new_v4(), "sref", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound(_)));
}

#[tokio::test]
async fn test_reject_removes_candidate_and_keeps_request_open() {
    let (store, service, host_request_id) = reference_world().await;

    let rejected = service.reject_match(host_request_id, "sref", "host").await.unwrap();
    assert!(rejected.success);

    let matches = service.find_compatible_matches(host_request_id).await.unwrap();
    let users: Vec<&str> = matches.iter().map(|m| m.user_id.as_str()).collect();
    assert_eq!(users, vec!["saec"]);

    let stored = store.get_request(host_request_id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Open);
}

#[tokio::test]
async fn test_cancel_then_reopen() {
    let (_store, service, host_request_id) = reference_world().await;

    let cancelled = service.cancel_match_request(host_request_id, "host").await.unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);

    let err = service.cancel_match_request(host_request_id, "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    assert!(service.find_compatible_matches(host_request_id).await.unwrap().is_empty());

    // the host may open a fresh request once the old one is closed
    let reopened = service.create_match_request("host", &match_data("ex-1")).await.unwrap();
    assert_ne!(reopened.id, host_request_id);
}

#[tokio::test]
async fn test_list_match_requests() {
    let (_store, service, host_request_id) = reference_world().await;
    service.accept_match(host_request_id, "sref", "host").await.unwrap();

    // both sides see their own request and the partner's, each now matched
    let hosted = service.list_match_requests("host", None, 20, 0).await.unwrap();
    assert_eq!(hosted.len(), 2);
    assert!(hosted.iter().all(|r| r.status == MatchStatus::Matched));

    let joined = service
        .list_match_requests("sref", Some(MatchStatus::Matched), 20, 0)
        .await
        .unwrap();
    assert_eq!(joined.len(), 2);
    assert!(joined.iter().any(|r| r.id == host_request_id));

    let still_open = service
        .list_match_requests("sref", Some(MatchStatus::Open), 20, 0)
        .await
        .unwrap();
    assert!(still_open.is_empty());

    let page = service.list_match_requests("sref", None, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn test_paired_user_is_not_offered_or_accepted_again() {
    let (store, service) = setup(vec![
        create_test_profile("a", PersonalityType::Laef, SEOUL),
        create_test_profile("b", PersonalityType::Sref, north_of_seoul(3.0)),
        create_test_profile("c", PersonalityType::Saec, north_of_seoul(6.0)),
    ]);
    let ra = service.create_match_request("a", &match_data("ex-1")).await.unwrap();
    let rb = service.create_match_request("b", &match_data("ex-1")).await.unwrap();
    let rc = service.create_match_request("c", &match_data("ex-1")).await.unwrap();

    let before: Vec<String> = service
        .find_compatible_matches(rc.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    assert!(before.contains(&"b".to_string()));

    service.accept_match(ra.id, "b", "a").await.unwrap();

    // b's own request closed together with a's
    let b_request = store.get_request(rb.id).await.unwrap().unwrap();
    assert_eq!(b_request.status, MatchStatus::Matched);
    assert_eq!(b_request.matched_user_id.as_deref(), Some("a"));

    let after = service.find_compatible_matches(rc.id).await.unwrap();
    assert!(after.iter().all(|m| m.user_id != "b" && m.user_id != "a"));

    let err = service.accept_match(rc.id, "b", "c").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    let c_request = store.get_request(rc.id).await.unwrap().unwrap();
    assert_eq!(c_request.status, MatchStatus::Open);

    // reopening for the same exhibition does not make b available again
    service.create_match_request("b", &match_data("ex-1")).await.unwrap();
    assert!(service.find_compatible_matches(rc.id).await.unwrap().is_empty());
    let err = service.accept_match(rc.id, "b", "c").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
}

#[tokio::test]
async fn test_accept_requires_available_candidate() {
    let (_store, service, host_request_id) = reference_world().await;

    service.reject_match(host_request_id, "sref", "host").await.unwrap();
    let err = service.accept_match(host_request_id, "sref", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));

    // saec withdrew, so there is nothing left to pair with
    let saec_request = service
        .list_match_requests("saec", Some(MatchStatus::Open), 20, 0)
        .await
        .unwrap()
        .remove(0);
    service.cancel_match_request(saec_request.id, "saec").await.unwrap();
    let err = service.accept_match(host_request_id, "saec", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));

    // lrmc is too far to be offered but still has an open request
    let accepted = service.accept_match(host_request_id, "lrmc", "host").await.unwrap();
    assert!(accepted.success);
}

#[tokio::test]
async fn test_expired_request_has_no_matches() {
    let store = Arc::new(MemoryStore::with_profiles(vec![
        create_test_profile("host", PersonalityType::Laef, SEOUL),
        create_test_profile("sref", PersonalityType::Sref, north_of_seoul(5.0)),
    ]));
    let lapsed = MatchingService::new(
        store.clone() as Arc<dyn MatchStore>,
        Matcher::with_defaults(),
        RequestDefaults {
            request_ttl_days: -1,
            ..RequestDefaults::default()
        },
    );
    let service = MatchingService::new(
        store.clone() as Arc<dyn MatchStore>,
        Matcher::with_defaults(),
        RequestDefaults::default(),
    );

    let host_request = lapsed.create_match_request("host", &match_data("ex-1")).await.unwrap();
    service.create_match_request("sref", &match_data("ex-1")).await.unwrap();

    let stored = store.get_request(host_request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Open);
    assert!(stored.expires_at < Utc::now());

    assert!(service.find_compatible_matches(host_request.id).await.unwrap().is_empty());
    let err = service.accept_match(host_request.id, "sref", "host").await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
}

#[tokio::test]
async fn test_feedback_rules() {
    let (_store, service, host_request_id) = reference_world().await;

    let err = service
        .submit_feedback(host_request_id, "host", 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));

    service.accept_match(host_request_id, "sref", "host").await.unwrap();

    let err = service
        .submit_feedback(host_request_id, "host", 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { .. }));

    let from_host = service
        .submit_feedback(host_request_id, "host", 5, Some("Great tour".to_string()))
        .await
        .unwrap();
    assert_eq!(from_host.target_user_id, "sref");

    let from_guest = service
        .submit_feedback(host_request_id, "sref", 4, None)
        .await
        .unwrap();
    assert_eq!(from_guest.target_user_id, "host");

    let err = service
        .submit_feedback(host_request_id, "host", 3, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));

    let err = service
        .submit_feedback(host_request_id, "saec", 3, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Unauthorized));
}

#[tokio::test]
async fn test_matching_analytics() {
    let (_store, service, host_request_id) = reference_world().await;

    let empty = service.get_matching_analytics("nobody").await.unwrap();
    assert_eq!(empty.matching_stats.total_requests, 0);
    assert_eq!(empty.success_rate, 0.0);
    assert_eq!(empty.feedback_stats.average_rating, None);

    service.accept_match(host_request_id, "sref", "host").await.unwrap();
    service
        .submit_feedback(host_request_id, "sref", 4, None)
        .await
        .unwrap();

    let second = service.create_match_request("host", &match_data("ex-3")).await.unwrap();
    service.cancel_match_request(second.id, "host").await.unwrap();

    let analytics = service.get_matching_analytics("host").await.unwrap();
    assert_eq!(analytics.user_id, "host");
    assert_eq!(analytics.matching_stats.total_requests, 2);
    assert_eq!(analytics.matching_stats.successful_matches, 1);
    assert_eq!(analytics.matching_stats.cancelled_requests, 1);
    assert_eq!(analytics.matching_stats.open_requests, 0);
    assert!(analytics.matching_stats.average_match_time_hours.is_some());
    assert_eq!(analytics.success_rate, 0.5);
    assert_eq!(analytics.feedback_stats.total_feedback, 1);
    assert_eq!(analytics.feedback_stats.average_rating, Some(4.0));
}

#[tokio::test]
async fn test_personality_compatibility_is_symmetric() {
    let (_store, service) = setup(vec![]);

    let forward = service.personality_compatibility(PersonalityType::Laef, PersonalityType::Srmc);
    let backward = service.personality_compatibility(PersonalityType::Srmc, PersonalityType::Laef);
    assert_eq!(forward.compatibility_score, backward.compatibility_score);
    assert_eq!(forward.compatibility_level, backward.compatibility_level);

    let own = service.personality_compatibility(PersonalityType::Lref, PersonalityType::Lref);
    assert!(own.compatibility_score >= 90);
}
