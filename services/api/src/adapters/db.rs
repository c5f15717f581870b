//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CatalogStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_recommender_core::domain::{
    normalize_topics, Course, CourseFilter, DeliveryFormat, Difficulty, FeedbackRecord,
    NewFeedback, UserPreferenceProfile,
};
use course_recommender_core::ports::{CatalogStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CatalogStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// `LIMIT`/`OFFSET` bind value; counts beyond `i64::MAX` saturate.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Wraps `text` for `ILIKE`, escaping the pattern metacharacters.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped.trim())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const COURSE_COLUMNS: &str =
    "id, title, description, topics, difficulty, duration, format, rating";

#[derive(FromRow)]
struct CourseRecord {
    id: String,
    title: String,
    description: String,
    topics: Vec<String>,
    difficulty: String,
    duration: String,
    format: String,
    rating: f64,
}
impl CourseRecord {
    fn to_domain(self) -> PortResult<Course> {
        let difficulty = self.difficulty.parse::<Difficulty>().map_err(|e| {
            PortError::Unexpected(format!("course {} has {}", self.id, e))
        })?;
        Ok(Course {
            id: self.id,
            title: self.title,
            description: self.description,
            topics: self.topics,
            difficulty,
            rating: self.rating,
            duration: self.duration,
            format: DeliveryFormat::parse(&self.format),
        })
    }
}

#[derive(FromRow)]
struct PreferenceRecord {
    preferred_topics: Vec<String>,
    avoided_topics: Vec<String>,
    difficulty_level: Option<String>,
    learning_style: Option<String>,
    time_commitment: Option<String>,
}
impl PreferenceRecord {
    fn to_domain(self) -> UserPreferenceProfile {
        UserPreferenceProfile {
            preferred_topics: normalize_topics(&self.preferred_topics),
            avoided_topics: normalize_topics(&self.avoided_topics),
            difficulty_level: self.difficulty_level.and_then(|v| v.parse().ok()),
            learning_style: self.learning_style.and_then(|v| v.parse().ok()),
            time_commitment: self.time_commitment.and_then(|v| v.parse().ok()),
        }
    }
}

const FEEDBACK_COLUMNS: &str = "f.id, f.user_id, f.course_id, \
     COALESCE(c.topics, '{}'::text[]) AS course_topics, f.rating, f.comment, \
     f.learning_style, f.difficulty_preference, f.created_at";

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    user_id: Uuid,
    course_id: String,
    course_topics: Vec<String>,
    rating: i16,
    comment: Option<String>,
    learning_style: Option<String>,
    difficulty_preference: Option<String>,
    created_at: DateTime<Utc>,
}
impl FeedbackRow {
    fn to_domain(self) -> PortResult<FeedbackRecord> {
        let rating = u8::try_from(self.rating)
            .map_err(|_| PortError::Unexpected(format!("feedback {} has rating {}", self.id, self.rating)))?;
        Ok(FeedbackRecord {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            course_topics: self.course_topics,
            rating,
            comment: self.comment,
            learning_style: self.learning_style.and_then(|v| v.parse().ok()),
            difficulty_preference: self.difficulty_preference.and_then(|v| v.parse().ok()),
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for DbAdapter {
    async fn get_course(&self, course_id: &str) -> PortResult<Course> {
        let record = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Course {} not found", course_id)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn list_courses(&self, filter: &CourseFilter) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE ($1::text IS NULL OR EXISTS (SELECT 1 FROM unnest(topics) t WHERE lower(t) = lower($1))) \
               AND ($2::text IS NULL OR difficulty = $2) \
               AND ($3::float8 IS NULL OR rating >= $3) \
             ORDER BY rating DESC, id ASC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.topic.as_deref().map(str::trim))
        .bind(filter.difficulty.map(|d| d.as_str()))
        .bind(filter.min_rating)
        .bind(sql_count(filter.limit))
        .bind(sql_count(filter.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(CourseRecord::to_domain).collect()
    }

    async fn search_courses(&self, text: &str, limit: usize) -> PortResult<Vec<Course>> {
        let records = sqlx::query_as::<_, CourseRecord>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE title ILIKE $1 OR description ILIKE $1 \
                OR EXISTS (SELECT 1 FROM unnest(topics) t WHERE t ILIKE $1) \
             ORDER BY rating DESC, id ASC \
             LIMIT $2"
        ))
        .bind(like_pattern(text))
        .bind(sql_count(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(CourseRecord::to_domain).collect()
    }

    async fn get_preferences(&self, user_id: Uuid) -> PortResult<Option<UserPreferenceProfile>> {
        let record = sqlx::query_as::<_, PreferenceRecord>(
            "SELECT preferred_topics, avoided_topics, difficulty_level, learning_style, time_commitment \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(PreferenceRecord::to_domain))
    }

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        profile: &UserPreferenceProfile,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_preferences \
                (user_id, preferred_topics, avoided_topics, difficulty_level, learning_style, time_commitment, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET \
                preferred_topics = EXCLUDED.preferred_topics, \
                avoided_topics = EXCLUDED.avoided_topics, \
                difficulty_level = EXCLUDED.difficulty_level, \
                learning_style = EXCLUDED.learning_style, \
                time_commitment = EXCLUDED.time_commitment, \
                updated_at = NOW()",
        )
        .bind(user_id)
        .bind(profile.preferred_topics.iter().cloned().collect::<Vec<String>>())
        .bind(profile.avoided_topics.iter().cloned().collect::<Vec<String>>())
        .bind(profile.difficulty_level.map(|d| d.as_str()))
        .bind(profile.learning_style.map(|s| s.as_str()))
        .bind(profile.time_commitment.map(|t| t.as_str()))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_feedback(&self, user_id: Uuid) -> PortResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM user_feedback f \
             LEFT JOIN courses c ON c.id = f.course_id \
             WHERE f.user_id = $1 \
             ORDER BY f.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        rows.into_iter().map(FeedbackRow::to_domain).collect()
    }

    async fn save_feedback(&self, feedback: NewFeedback) -> PortResult<FeedbackRecord> {
        let row = sqlx::query_as::<_, FeedbackRow>(&format!(
            "WITH f AS ( \
                INSERT INTO user_feedback \
                    (id, user_id, course_id, rating, comment, learning_style, difficulty_preference) \
                VALUES ($1, $2, $3, $4, $5, $6, $7) \
                RETURNING * \
             ) \
             SELECT {FEEDBACK_COLUMNS} FROM f LEFT JOIN courses c ON c.id = f.course_id"
        ))
        .bind(Uuid::new_v4())
        .bind(feedback.user_id)
        .bind(&feedback.course_id)
        .bind(i16::from(feedback.rating))
        .bind(&feedback.comment)
        .bind(feedback.learning_style.map(|s| s.as_str()))
        .bind(feedback.difficulty_preference.map(|d| d.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        row.to_domain()
    }

    async fn delete_feedback(&self, user_id: Uuid, feedback_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM user_feedback WHERE id = $1 AND user_id = $2")
            .bind(feedback_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Feedback {} not found", feedback_id)));
        }
        Ok(())
    }
}
