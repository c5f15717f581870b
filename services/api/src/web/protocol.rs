//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response bodies of the REST API, and their
//! conversions from and to the `core` domain types.

use chrono::{DateTime, Utc};
use course_recommender_core::domain::{
    CandidateCourse, Course, CourseFilter, FeedbackRecord, ParseEnumError, PreferenceUpdate,
    RankedCourse, UserPreferenceProfile,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Upper bound for one page of `GET /courses`.
pub const MAX_PAGE_SIZE: usize = 100;

//=========================================================================================
// Courses
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    pub difficulty: String,
    /// Base rating on a 0-5 scale.
    pub rating: f64,
    pub duration: String,
    pub format: String,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            topics: course.topics,
            difficulty: course.difficulty.to_string(),
            rating: course.rating,
            duration: course.duration,
            format: course.format.to_string(),
        }
    }
}

/// A course returned by a similarity search.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SimilarCourseResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub similarity: Option<f64>,
}

impl From<CandidateCourse> for SimilarCourseResponse {
    fn from(candidate: CandidateCourse) -> Self {
        Self {
            course: candidate.course.into(),
            similarity: candidate.similarity,
        }
    }
}

/// Query parameters for browsing the catalog.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseListQuery {
    /// Only courses tagged with this topic.
    pub topic: Option<String>,
    /// `beginner`, `intermediate` or `advanced`.
    pub difficulty: Option<String>,
    pub min_rating: Option<f64>,
    /// Page size, at most 100.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl CourseListQuery {
    pub fn into_filter(self) -> Result<CourseFilter, ParseEnumError> {
        let defaults = CourseFilter::default();
        Ok(CourseFilter {
            topic: self.topic.filter(|t| !t.trim().is_empty()),
            difficulty: self.difficulty.as_deref().map(str::parse).transpose()?,
            min_rating: self.min_rating,
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(defaults.offset),
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaxResultsQuery {
    /// Between 1 and 20; the server default applies when omitted.
    pub max_results: Option<i64>,
}

//=========================================================================================
// Recommendations
//=========================================================================================

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    /// Free text such as "python for data science but not statistics".
    pub query: Option<String>,
    pub max_results: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendedCourseResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub score: f64,
    pub similarity: Option<f64>,
    /// Preferred topics this course covers.
    pub matched_topics: Vec<String>,
}

impl From<RankedCourse> for RecommendedCourseResponse {
    fn from(ranked: RankedCourse) -> Self {
        Self {
            course: ranked.candidate.course.into(),
            score: ranked.score,
            similarity: ranked.candidate.similarity,
            matched_topics: ranked.matched_topics,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationResponse {
    pub courses: Vec<RecommendedCourseResponse>,
    pub reasoning: String,
    /// The preferences the ranking used, including per-query exclusions.
    pub preferences: PreferencesResponse,
    /// The search text derived from the query, if one was given.
    pub query_processed: Option<String>,
}

//=========================================================================================
// Preferences
//=========================================================================================

#[derive(Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PreferencesResponse {
    pub preferred_topics: Vec<String>,
    pub avoided_topics: Vec<String>,
    pub difficulty_level: Option<String>,
    pub learning_style: Option<String>,
    pub time_commitment: Option<String>,
}

impl From<UserPreferenceProfile> for PreferencesResponse {
    fn from(profile: UserPreferenceProfile) -> Self {
        Self {
            preferred_topics: profile.preferred_topics.into_iter().collect(),
            avoided_topics: profile.avoided_topics.into_iter().collect(),
            difficulty_level: profile.difficulty_level.map(|d| d.to_string()),
            learning_style: profile.learning_style.map(|s| s.to_string()),
            time_commitment: profile.time_commitment.map(|t| t.to_string()),
        }
    }
}

/// A partial update; omitted fields keep their stored value and an explicit
/// `null` clears a difficulty, style or commitment.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PreferencesUpdateRequest {
    pub preferred_topics: Option<Vec<String>>,
    pub avoided_topics: Option<Vec<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub difficulty_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub learning_style: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub time_commitment: Option<Option<String>>,
}

/// Marks a field as present, so `null` becomes `Some(None)` instead of `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_setting<T>(value: Option<Option<String>>) -> Result<Option<Option<T>>, ParseEnumError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .map(|setting| setting.as_deref().map(str::parse).transpose())
        .transpose()
}

impl TryFrom<PreferencesUpdateRequest> for PreferenceUpdate {
    type Error = ParseEnumError;

    fn try_from(request: PreferencesUpdateRequest) -> Result<Self, Self::Error> {
        Ok(PreferenceUpdate {
            preferred_topics: request.preferred_topics,
            avoided_topics: request.avoided_topics,
            difficulty_level: parse_setting(request.difficulty_level)?,
            learning_style: parse_setting(request.learning_style)?,
            time_commitment: parse_setting(request.time_commitment)?,
        })
    }
}

//=========================================================================================
// Feedback
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub course_id: String,
    /// 1 (disliked) to 5 (loved).
    pub rating: i64,
    pub comment: Option<String>,
    pub learning_style: Option<String>,
    pub difficulty_preference: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub learning_style: Option<String>,
    pub difficulty_preference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<FeedbackRecord> for FeedbackResponse {
    fn from(record: FeedbackRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            course_id: record.course_id,
            rating: record.rating,
            comment: record.comment,
            learning_style: record.learning_style.map(|s| s.to_string()),
            difficulty_preference: record.difficulty_preference.map(|d| d.to_string()),
            created_at: record.created_at,
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub vector_search_ready: bool,
}
