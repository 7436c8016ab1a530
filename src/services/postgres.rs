use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::core::personality::PersonalityType;
use crate::models::{
    AgeRange, FeedbackStats, GeoPoint, MatchFeedback, MatchRequest, MatchStatus, NewFeedback,
    NewMatchRequest, PoolMember, RequestStats, UserProfile,
};
use crate::services::store::{MatchStore, PairOutcome, PoolQuery, StoreError};

const REQUEST_COLUMNS: &str = r#"
    em.id, em.exhibition_id, em.host_user_id, em.preferred_date, em.time_slot,
    em.max_distance_km, em.age_min, em.age_max, em.preferred_types, em.status,
    em.matched_user_id, em.matched_at, em.created_at, em.expires_at
"#;

/// PostgreSQL-backed match store
///
/// Duplicate prevention relies on the partial unique index
/// `exhibition_matches_one_open_per_host`; status changes are conditional
/// updates on `status = 'open'`, so both hold under concurrent callers.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{}: {}", what, err))
}

fn request_from_row(row: &PgRow) -> Result<MatchRequest, StoreError> {
    let age_min: Option<i16> = row.try_get("age_min")?;
    let age_max: Option<i16> = row.try_get("age_max")?;
    let age_range = match (age_min, age_max) {
        (Some(min), Some(max)) => Some(AgeRange {
            min: u8::try_from(min).map_err(|e| corrupt("age_min", e))?,
            max: u8::try_from(max).map_err(|e| corrupt("age_max", e))?,
        }),
        _ => None,
    };

    let raw_types: Vec<String> = row.try_get("preferred_types")?;
    let preferred_types = raw_types
        .iter()
        .map(|t| t.parse::<PersonalityType>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| corrupt("preferred_types", e))?;

    Ok(MatchRequest {
        id: row.try_get("id")?,
        exhibition_id: row.try_get("exhibition_id")?,
        host_user_id: row.try_get("host_user_id")?,
        preferred_date: row.try_get("preferred_date")?,
        time_slot: row.try_get("time_slot")?,
        max_distance_km: row.try_get("max_distance_km")?,
        age_range,
        preferred_types,
        status: row.try_get("status")?,
        matched_user_id: row.try_get("matched_user_id")?,
        matched_at: row.try_get("matched_at")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn profile_from_row(row: &PgRow, user_column: &str) -> Result<UserProfile, StoreError> {
    let raw_type: String = row.try_get("personality_type")?;
    let age: Option<i16> = row.try_get("age")?;

    Ok(UserProfile {
        user_id: row.try_get(user_column)?,
        personality_type: raw_type.parse().map_err(|e| corrupt("personality_type", e))?,
        location: GeoPoint {
            lat: row.try_get("latitude")?,
            lon: row.try_get("longitude")?,
        },
        age: age
            .map(u8::try_from)
            .transpose()
            .map_err(|e| corrupt("age", e))?,
        nickname: row.try_get("nickname")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl MatchStore for PostgresClient {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let query = r#"
            SELECT user_id, personality_type, latitude, longitude, age, nickname
            FROM user_profiles
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query).bind(user_id).fetch_optional(&self.pool).await?;
        row.map(|r| profile_from_row(&r, "user_id")).transpose()
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO user_profiles (user_id, personality_type, latitude, longitude, age, nickname, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                personality_type = EXCLUDED.personality_type,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                age = EXCLUDED.age,
                nickname = EXCLUDED.nickname,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(&profile.user_id)
            .bind(profile.personality_type.code())
            .bind(profile.location.lat)
            .bind(profile.location.lon)
            .bind(profile.age.map(i16::from))
            .bind(&profile.nickname)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_open_request(&self, request: NewMatchRequest) -> Result<MatchRequest, StoreError> {
        let query = format!(
            r#"
            INSERT INTO exhibition_matches AS em
                (id, exhibition_id, host_user_id, preferred_date, time_slot, max_distance_km,
                 age_min, age_max, preferred_types, status, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'open', $10)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        let types: Vec<&str> = request.preferred_types.iter().map(|t| t.code()).collect();

        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&request.exhibition_id)
            .bind(&request.host_user_id)
            .bind(request.preferred_date)
            .bind(request.time_slot)
            .bind(request.max_distance_km)
            .bind(request.age_range.map(|r| i16::from(r.min)))
            .bind(request.age_range.map(|r| i16::from(r.max)))
            .bind(&types)
            .bind(request.expires_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => {
                let created = request_from_row(&row)?;
                tracing::debug!("Inserted match request {} for {}", created.id, created.host_user_id);
                Ok(created)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateOpenRequest(request.host_user_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<MatchRequest>, StoreError> {
        let query = format!("SELECT {} FROM exhibition_matches em WHERE em.id = $1", REQUEST_COLUMNS);

        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| request_from_row(&r)).transpose()
    }

    async fn candidate_pool(&self, query: &PoolQuery) -> Result<Vec<PoolMember>, StoreError> {
        let sql = format!(
            r#"
            SELECT {},
                   up.personality_type, up.latitude, up.longitude, up.age, up.nickname
            FROM exhibition_matches em
            JOIN user_profiles up ON up.user_id = em.host_user_id
            WHERE em.status = 'open'
              AND em.exhibition_id = $1
              AND em.host_user_id <> $2
              AND em.preferred_date BETWEEN $3 AND $4
              AND em.expires_at > NOW()
              AND NOT EXISTS (
                  SELECT 1 FROM exhibition_matches paired
                  WHERE paired.exhibition_id = em.exhibition_id
                    AND paired.status = 'matched'
                    AND (paired.host_user_id = em.host_user_id OR paired.matched_user_id = em.host_user_id)
              )
            ORDER BY em.created_at
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(&query.exhibition_id)
            .bind(&query.exclude_user_id)
            .bind(query.earliest_date)
            .bind(query.latest_date)
            .fetch_all(&self.pool)
            .await?;

        let pool = rows
            .iter()
            .map(|row| {
                Ok(PoolMember {
                    request: request_from_row(row)?,
                    profile: profile_from_row(row, "host_user_id")?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        tracing::debug!(
            "Pool for exhibition {} has {} open requests",
            query.exhibition_id,
            pool.len()
        );

        Ok(pool)
    }

    async fn transition(&self, id: Uuid, to: MatchStatus) -> Result<Option<MatchRequest>, StoreError> {
        let query = format!(
            r#"
            UPDATE exhibition_matches AS em
            SET status = $2
            WHERE em.id = $1 AND em.status = 'open'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| request_from_row(&r)).transpose()
    }

    async fn pair(&self, request_id: Uuid, candidate_user_id: &str) -> Result<PairOutcome, StoreError> {
        let Some(host_request) = self.get_request(request_id).await? else {
            return Ok(PairOutcome::RequestClosed);
        };

        let mut tx = self.pool.begin().await?;

        // Both rows are locked in id order so crossed accepts cannot deadlock
        let lock = format!(
            r#"
            SELECT {}
            FROM exhibition_matches em
            WHERE em.id = $1
               OR (em.exhibition_id = $2 AND em.host_user_id = $3 AND em.status = 'open' AND em.expires_at > NOW())
            ORDER BY em.id
            FOR UPDATE
            "#,
            REQUEST_COLUMNS
        );
        let locked = sqlx::query(&lock)
            .bind(request_id)
            .bind(&host_request.exhibition_id)
            .bind(candidate_user_id)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(request_from_row)
            .collect::<Result<Vec<_>, StoreError>>()?;

        let host_open = locked.iter().any(|r| r.id == request_id && r.is_open());
        if !host_open {
            tx.rollback().await?;
            return Ok(PairOutcome::RequestClosed);
        }
        let Some(candidate_request_id) = locked
            .iter()
            .find(|r| r.id != request_id && r.is_open() && r.host_user_id == candidate_user_id)
            .map(|r| r.id)
        else {
            tx.rollback().await?;
            return Ok(PairOutcome::CandidateUnavailable);
        };

        let unavailable: bool = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM matching_rejections
                WHERE match_request_id = $1 AND candidate_user_id = $2
            ) OR EXISTS (
                SELECT 1 FROM exhibition_matches
                WHERE exhibition_id = $3
                  AND status = 'matched'
                  AND (host_user_id = $2 OR matched_user_id = $2)
            )
            "#,
        )
        .bind(request_id)
        .bind(candidate_user_id)
        .bind(&host_request.exhibition_id)
        .fetch_one(&mut *tx)
        .await?;
        if unavailable {
            tx.rollback().await?;
            return Ok(PairOutcome::CandidateUnavailable);
        }

        let close = format!(
            r#"
            UPDATE exhibition_matches AS em
            SET status = 'matched', matched_user_id = $2, matched_at = NOW()
            WHERE em.id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );
        sqlx::query(&close)
            .bind(candidate_request_id)
            .bind(&host_request.host_user_id)
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query(&close)
            .bind(request_id)
            .bind(candidate_user_id)
            .fetch_one(&mut *tx)
            .await?;
        let paired = request_from_row(&row)?;

        tx.commit().await?;
        tracing::debug!("Paired request {} with request {}", paired.id, candidate_request_id);

        Ok(PairOutcome::Paired(paired))
    }

    async fn record_rejection(
        &self,
        request_id: Uuid,
        candidate_user_id: &str,
        rejecting_user_id: &str,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO matching_rejections (match_request_id, candidate_user_id, rejecting_user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (match_request_id, candidate_user_id) DO NOTHING
        "#;

        sqlx::query(query)
            .bind(request_id)
            .bind(candidate_user_id)
            .bind(rejecting_user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn rejected_candidates(&self, request_id: Uuid) -> Result<Vec<String>, StoreError> {
        let query = r#"
            SELECT candidate_user_id
            FROM matching_rejections
            WHERE match_request_id = $1
        "#;

        let rows = sqlx::query(query).bind(request_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get("candidate_user_id").map_err(StoreError::from))
            .collect()
    }

    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<MatchStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MatchRequest>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM exhibition_matches em
            WHERE (em.host_user_id = $1 OR em.matched_user_id = $1)
              AND ($2::match_status IS NULL OR em.status = $2)
            ORDER BY em.created_at DESC, em.id
            LIMIT $3 OFFSET $4
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(status)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<MatchFeedback, StoreError> {
        let query = r#"
            INSERT INTO match_feedback (id, match_request_id, reviewer_user_id, target_user_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
        "#;

        let result = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(feedback.match_request_id)
            .bind(&feedback.reviewer_user_id)
            .bind(&feedback.target_user_id)
            .bind(i16::from(feedback.rating))
            .bind(&feedback.comment)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(MatchFeedback {
                id: row.try_get("id")?,
                match_request_id: feedback.match_request_id,
                reviewer_user_id: feedback.reviewer_user_id,
                target_user_id: feedback.target_user_id,
                rating: feedback.rating,
                comment: feedback.comment,
                created_at: row.try_get("created_at")?,
            }),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateFeedback {
                request_id: feedback.match_request_id,
                reviewer: feedback.reviewer_user_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn request_stats(&self, user_id: &str) -> Result<RequestStats, StoreError> {
        let query = r#"
            SELECT
                COUNT(*) as total_requests,
                COUNT(*) FILTER (WHERE status = 'open') as open_requests,
                COUNT(*) FILTER (WHERE status = 'matched') as successful_matches,
                COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled_requests,
                (AVG(EXTRACT(EPOCH FROM (matched_at - created_at)) / 3600.0)
                    FILTER (WHERE status = 'matched'))::float8 as average_match_time_hours
            FROM exhibition_matches
            WHERE host_user_id = $1
        "#;

        let row = sqlx::query(query).bind(user_id).fetch_one(&self.pool).await?;

        Ok(RequestStats {
            total_requests: row.try_get("total_requests")?,
            open_requests: row.try_get("open_requests")?,
            successful_matches: row.try_get("successful_matches")?,
            cancelled_requests: row.try_get("cancelled_requests")?,
            average_match_time_hours: row.try_get("average_match_time_hours")?,
        })
    }

    async fn feedback_stats(&self, user_id: &str) -> Result<FeedbackStats, StoreError> {
        let query = r#"
            SELECT
                COUNT(*) as total_feedback,
                AVG(rating)::float8 as average_rating
            FROM match_feedback
            WHERE target_user_id = $1
        "#;

        let row = sqlx::query(query).bind(user_id).fetch_one(&self.pool).await?;

        Ok(FeedbackStats {
            total_feedback: row.try_get("total_feedback")?,
            average_rating: row.try_get("average_rating")?,
        })
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
