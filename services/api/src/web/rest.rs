//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{ApiError, ErrorResponse};
use crate::web::protocol::{
    CourseListQuery, CourseResponse, FeedbackRequest, FeedbackResponse, HealthResponse,
    MaxResultsQuery, PreferencesResponse, PreferencesUpdateRequest, RecommendationRequest,
    RecommendationResponse, RecommendedCourseResponse, SimilarCourseResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use course_recommender_core::domain::{NewFeedback, PreferenceUpdate};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

/// Largest `max_results` a client may ask for.
pub const MAX_RESULTS_LIMIT: i64 = 20;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_courses_handler,
        get_course_handler,
        similar_courses_handler,
        recommend_handler,
        recommend_default_handler,
        get_preferences_handler,
        update_preferences_handler,
        list_feedback_handler,
        submit_feedback_handler,
        delete_feedback_handler,
    ),
    components(
        schemas(
            CourseResponse,
            SimilarCourseResponse,
            RecommendationRequest,
            RecommendationResponse,
            RecommendedCourseResponse,
            PreferencesResponse,
            PreferencesUpdateRequest,
            FeedbackRequest,
            FeedbackResponse,
            HealthResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Course Recommender API", description = "Personalized course recommendations, catalog browsing and learner feedback.")
    )
)]
pub struct ApiDoc;

/// Applies the configured default and the `1..=20` bound.
fn resolve_max_results(requested: Option<i64>, default: i64) -> Result<i64, ApiError> {
    let max_results = requested.unwrap_or(default);
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(ApiError::BadRequest(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, max_results
        )));
    }
    Ok(max_results)
}

//=========================================================================================
// Health
//=========================================================================================

/// Liveness plus the readiness of the vector search backend.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let vector_search_ready = app_state.service.vector_search_ready().await;
    Json(HealthResponse {
        status: if vector_search_ready { "ok" } else { "degraded" }.to_string(),
        vector_search_ready,
    })
}

//=========================================================================================
// Courses
//=========================================================================================

/// Browse the catalog, best rated first.
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseListQuery),
    responses(
        (status = 200, description = "A page of courses", body = [CourseResponse]),
        (status = 400, description = "Unknown difficulty", body = ErrorResponse)
    )
)]
pub async fn list_courses_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let filter = query.into_filter()?;
    let courses = app_state.service.list_courses(&filter).await?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/courses/{course_id}",
    params(("course_id" = String, Path, description = "The catalog id of the course.")),
    responses(
        (status = 200, description = "The course", body = CourseResponse),
        (status = 404, description = "Unknown course", body = ErrorResponse)
    )
)]
pub async fn get_course_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = app_state.service.get_course(&course_id).await?;
    Ok(Json(course.into()))
}

/// Courses semantically similar to the given one.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/similar",
    params(
        ("course_id" = String, Path, description = "The catalog id of the course."),
        MaxResultsQuery
    ),
    responses(
        (status = 200, description = "Similar courses, most similar first", body = [SimilarCourseResponse]),
        (status = 400, description = "max_results out of range", body = ErrorResponse),
        (status = 404, description = "Unknown course", body = ErrorResponse),
        (status = 503, description = "Vector search unavailable", body = ErrorResponse)
    )
)]
pub async fn similar_courses_handler(
    State(app_state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
    Query(query): Query<MaxResultsQuery>,
) -> Result<Json<Vec<SimilarCourseResponse>>, ApiError> {
    let max_results =
        resolve_max_results(query.max_results, app_state.config.default_max_results)?;
    let similar = app_state
        .service
        .similar_courses(&course_id, max_results)
        .await?;
    Ok(Json(similar.into_iter().map(SimilarCourseResponse::from).collect()))
}

//=========================================================================================
// Recommendations
//=========================================================================================

async fn recommend(
    app_state: &AppState,
    user_id: Uuid,
    request: RecommendationRequest,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let max_results =
        resolve_max_results(request.max_results, app_state.config.default_max_results)?;
    info!(user_id = %user_id, max_results, "Recommendation requested");

    let recommendation = app_state
        .service
        .recommend(user_id, request.query.as_deref(), max_results)
        .await?;
    let result = recommendation.result;

    Ok(Json(RecommendationResponse {
        courses: result
            .courses
            .into_iter()
            .map(RecommendedCourseResponse::from)
            .collect(),
        reasoning: result.rationale,
        preferences: result.preferences.into(),
        query_processed: recommendation.query_processed,
    }))
}

/// Personalized recommendations, optionally steered by a free-text query.
#[utoipa::path(
    post,
    path = "/recommendations/{user_id}",
    params(("user_id" = Uuid, Path, description = "The unique ID of the user.")),
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Ranked courses with a rationale", body = RecommendationResponse),
        (status = 400, description = "max_results out of range", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn recommend_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    recommend(&app_state, user_id, request).await
}

/// Recommendations from stored preferences and feedback only.
#[utoipa::path(
    get,
    path = "/recommendations/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "The unique ID of the user."),
        MaxResultsQuery
    ),
    responses(
        (status = 200, description = "Ranked courses with a rationale", body = RecommendationResponse),
        (status = 400, description = "max_results out of range", body = ErrorResponse)
    )
)]
pub async fn recommend_default_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<MaxResultsQuery>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let request = RecommendationRequest {
        query: None,
        max_results: query.max_results,
    };
    recommend(&app_state, user_id, request).await
}

//=========================================================================================
// Preferences
//=========================================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/preferences",
    params(("user_id" = Uuid, Path, description = "The unique ID of the user.")),
    responses((status = 200, description = "Stored preferences, empty when never set", body = PreferencesResponse))
)]
pub async fn get_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let profile = app_state.service.get_preferences(user_id).await?;
    Ok(Json(profile.into()))
}

/// Partially update preferences; omitted fields are kept.
#[utoipa::path(
    put,
    path = "/users/{user_id}/preferences",
    params(("user_id" = Uuid, Path, description = "The unique ID of the user.")),
    request_body = PreferencesUpdateRequest,
    responses(
        (status = 200, description = "The updated preferences", body = PreferencesResponse),
        (status = 400, description = "Unknown difficulty, style or commitment", body = ErrorResponse)
    )
)]
pub async fn update_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<PreferencesUpdateRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let update = PreferenceUpdate::try_from(request)?;
    let profile = app_state
        .service
        .update_preferences(user_id, update)
        .await?;
    Ok(Json(profile.into()))
}

//=========================================================================================
// Feedback
//=========================================================================================

#[utoipa::path(
    get,
    path = "/users/{user_id}/feedback",
    params(("user_id" = Uuid, Path, description = "The unique ID of the user.")),
    responses((status = 200, description = "Feedback, newest first", body = [FeedbackResponse]))
)]
pub async fn list_feedback_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<FeedbackResponse>>, ApiError> {
    let feedback = app_state.service.list_feedback(user_id).await?;
    Ok(Json(feedback.into_iter().map(FeedbackResponse::from).collect()))
}

/// Rate a course. Ratings of 2 or less hide the course and its topics from
/// later recommendations; 4 or more favour its topics.
#[utoipa::path(
    post,
    path = "/users/{user_id}/feedback",
    params(("user_id" = Uuid, Path, description = "The unique ID of the user.")),
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback stored", body = FeedbackResponse),
        (status = 400, description = "Rating outside 1-5 or unknown enum value", body = ErrorResponse),
        (status = 404, description = "Unknown course", body = ErrorResponse)
    )
)]
pub async fn submit_feedback_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rating = u8::try_from(request.rating)
        .map_err(|_| ApiError::BadRequest(format!("rating must be between 1 and 5, got {}", request.rating)))?;
    let feedback = NewFeedback {
        user_id,
        course_id: request.course_id,
        rating,
        comment: request.comment.filter(|c| !c.trim().is_empty()),
        learning_style: request.learning_style.as_deref().map(str::parse).transpose()?,
        difficulty_preference: request
            .difficulty_preference
            .as_deref()
            .map(str::parse)
            .transpose()?,
    };
    let record = app_state.service.submit_feedback(feedback).await?;
    Ok((StatusCode::CREATED, Json(FeedbackResponse::from(record))))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/feedback/{feedback_id}",
    params(
        ("user_id" = Uuid, Path, description = "The unique ID of the user."),
        ("feedback_id" = Uuid, Path, description = "The feedback record to delete.")
    ),
    responses(
        (status = 204, description = "Feedback deleted"),
        (status = 404, description = "No such feedback for this user", body = ErrorResponse)
    )
)]
pub async fn delete_feedback_handler(
    State(app_state): State<Arc<AppState>>,
    Path((user_id, feedback_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .service
        .delete_feedback(user_id, feedback_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
