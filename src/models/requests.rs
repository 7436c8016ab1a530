use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::AgeRange;

/// Match data supplied when opening a request
///
/// Dates, slots and personality codes arrive as strings and are parsed by the
/// matching service so a bad value is reported against its field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchData {
    #[validate(length(min = 1, message = "exhibitionId is required"))]
    #[serde(default, alias = "exhibition_id")]
    pub exhibition_id: String,
    #[validate(length(min = 1, message = "preferredDate is required"))]
    #[serde(default, alias = "preferred_date")]
    pub preferred_date: String,
    #[validate(length(min = 1, message = "timeSlot is required"))]
    #[serde(default, alias = "time_slot")]
    pub time_slot: String,
    #[validate(range(exclusive_min = 0.0, max = 500.0, message = "maxDistance must be in (0, 500] km"))]
    #[serde(default, alias = "max_distance")]
    pub max_distance: Option<f64>,
    #[serde(default, alias = "age_range")]
    pub age_range: Option<AgeRange>,
    #[serde(default, alias = "preferred_types", alias = "preferredAptTypes")]
    pub preferred_types: Vec<String>,
}

/// Body of `POST /matching/exhibition`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(flatten)]
    pub match_data: MatchData,
}

/// Body of the accept and reject endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MatchDecisionBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(alias = "match_request_id")]
    pub match_request_id: Uuid,
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_user_id")]
    pub candidate_user_id: String,
}

/// Body carrying only the acting user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActingUserBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
}

/// Body of `POST /matching/exhibition/{id}/feedback`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub rating: u8,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query of `GET /matching/exhibition/my-matches`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListMatchesQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u16,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u16 {
    20
}

/// Query carrying only the acting user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_flattens_match_data() {
        let body: CreateMatchBody = serde_json::from_str(
            r#"{"userId":"u1","exhibitionId":"ex-9","preferredDate":"2030-01-01","timeSlot":"morning","maxDistance":25}"#,
        )
        .unwrap();

        assert_eq!(body.user_id, "u1");
        assert_eq!(body.match_data.exhibition_id, "ex-9");
        assert_eq!(body.match_data.max_distance, Some(25.0));
        assert!(body.validate().is_ok());
        assert!(body.match_data.validate().is_ok());
    }

    #[test]
    fn test_missing_exhibition_fails_validation() {
        let data = MatchData {
            preferred_date: "2030-01-01".to_string(),
            time_slot: "evening".to_string(),
            ..Default::default()
        };

        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("exhibition_id"));
    }

    #[test]
    fn test_non_positive_distance_fails_validation() {
        let data = MatchData {
            exhibition_id: "ex".to_string(),
            preferred_date: "2030-01-01".to_string(),
            time_slot: "evening".to_string(),
            max_distance: Some(0.0),
            ..Default::default()
        };

        assert!(data.validate().is_err());
    }

    #[test]
    fn test_legacy_apt_types_alias() {
        let data: MatchData = serde_json::from_str(r#"{"preferredAptTypes":["LAEF"]}"#).unwrap();
        assert_eq!(data.preferred_types, vec!["LAEF"]);
    }
}
