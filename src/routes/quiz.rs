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
    dto::quiz_dto::{
        CreateQuizPayload, QuizResponse, SubmissionResult, SubmissionView, SubmitQuizPayload,
    },
    error::Result,
    middleware::auth::CurrentUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/quizzes",
    request_body = CreateQuizPayload,
    responses(
        (status = 201, description = "Quiz created", body = QuizResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Teacher profile not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.create(user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Quiz created successfully", quiz)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/teacher",
    responses((status = 200, description = "Own quizzes, latest start first", body = [QuizResponse])),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn teacher_quizzes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_for_teacher(user.id).await?;
    Ok(Json(ApiResponse::data(quizzes)))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/student/available",
    responses(
        (status = 200, description = "Active quizzes for the student's class", body = [QuizResponse]),
        (status = 404, description = "Student profile not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn student_available(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_available_for_student(user.id).await?;
    Ok(Json(ApiResponse::data(quizzes)))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz, with answers for its author", body = QuizResponse),
        (status = 403, description = "Not the author or a student of the class"),
        (status = 404, description = "Quiz not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get_for_viewer(id, &user).await?;
    Ok(Json(ApiResponse::data(quiz)))
}

#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/submit",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    request_body = SubmitQuizPayload,
    responses(
        (status = 201, description = "Graded submission", body = SubmissionResult),
        (status = 400, description = "Quiz closed or invalid payload"),
        (status = 403, description = "Quiz is for another class"),
        (status = 409, description = "Already submitted")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state.quiz_service.submit(id, user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Quiz submitted successfully", result)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/submissions",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Submissions, earliest first", body = [SubmissionView]),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Quiz not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn quiz_submissions(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submissions = state.quiz_service.submissions(id, user.id).await?;
    Ok(Json(ApiResponse::data(submissions)))
}

#[utoipa::path(
    patch,
    path = "/api/quizzes/{id}/close",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz no longer accepts submissions", body = QuizResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Quiz not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn close_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.close(id, user.id).await?;
    Ok(Json(ApiResponse::with_message("Quiz closed", quiz)))
}
