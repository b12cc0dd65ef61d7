use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::common::ApiResponse,
    dto::student_dto::{
        AddFeedbackPayload, RecordAttendancePayload, RecordPerformancePayload, StudentSummary,
    },
    error::{Error, Result},
    middleware::auth::CurrentUser,
    models::{student::FeedbackEntry, user::Role},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/students/{id}/attendance",
    params(("id" = Uuid, Path, description = "Student profile ID")),
    request_body = RecordAttendancePayload,
    responses(
        (status = 201, description = "Attendance recorded"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn record_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordAttendancePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state
        .student_service
        .record_attendance(id, payload, user.id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Attendance recorded", record)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/students/{id}/performance",
    params(("id" = Uuid, Path, description = "Student profile ID")),
    request_body = RecordPerformancePayload,
    responses(
        (status = 201, description = "Exam result recorded"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn record_performance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPerformancePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let record = state.student_service.record_performance(id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Performance recorded", record)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/students/{id}/feedback",
    params(("id" = Uuid, Path, description = "Student profile ID")),
    request_body = AddFeedbackPayload,
    responses(
        (status = 201, description = "Feedback recorded", body = FeedbackEntry),
        (status = 400, description = "Empty or overlong comment"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn add_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddFeedbackPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let entry = state
        .student_service
        .add_feedback(id, payload, user.id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Feedback recorded", entry)),
    ))
}

/// Staff can read any summary; a student only their own.
#[utoipa::path(
    get,
    path = "/api/students/{id}/summary",
    params(("id" = Uuid, Path, description = "Student profile ID")),
    responses(
        (status = 200, description = "Attendance and performance summary", body = StudentSummary),
        (status = 403, description = "Not allowed to view this student"),
        (status = 404, description = "Student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if user.role == Role::Student {
        let own = state.user_service.student_by_user(user.id).await?;
        if own.map(|s| s.id) != Some(id) {
            return Err(Error::Forbidden("Not authorized to view this student".into()));
        }
    }
    let summary = state.student_service.summary(id).await?;
    Ok(Json(ApiResponse::data(summary)))
}
