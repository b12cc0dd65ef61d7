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
    dto::virtual_class_dto::{CreateVirtualClassPayload, JoinResponse, VirtualClassResponse},
    error::Result,
    middleware::auth::CurrentUser,
    models::virtual_class::ClassAction,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/virtual-class/create",
    request_body = CreateVirtualClassPayload,
    responses(
        (status = 201, description = "Virtual class scheduled", body = VirtualClassResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Teacher profile not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateVirtualClassPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let class = state.virtual_class_service.create(user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Virtual class created successfully",
            class,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/virtual-class/teacher/classes",
    responses((status = 200, description = "Own classes, newest first", body = [VirtualClassResponse])),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn teacher_classes(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let classes = state.virtual_class_service.list_for_teacher(user.id).await?;
    Ok(Json(ApiResponse::data(classes)))
}

#[utoipa::path(
    get,
    path = "/api/virtual-class/student/available",
    responses((status = 200, description = "Upcoming and live classes for the student's grade", body = [VirtualClassResponse])),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn student_available(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let classes = state
        .virtual_class_service
        .list_available_for_student(user.id)
        .await?;
    Ok(Json(ApiResponse::data(classes)))
}

#[utoipa::path(
    get,
    path = "/api/virtual-class/{id}",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Class with teacher and roster", body = VirtualClassResponse),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let class = state.virtual_class_service.get_detail(id, user.id).await?;
    Ok(Json(ApiResponse::data(class)))
}

async fn transition(
    state: &AppState,
    id: Uuid,
    user: CurrentUser,
    action: ClassAction,
    done: &str,
) -> Result<Json<ApiResponse<VirtualClassResponse>>> {
    let (class, changed) = state
        .virtual_class_service
        .transition(id, user.id, action)
        .await?;
    let message = if changed {
        done.to_string()
    } else {
        format!("Class is already {}", class.status)
    };
    Ok(Json(ApiResponse::with_message(message, class)))
}

#[utoipa::path(
    patch,
    path = "/api/virtual-class/{id}/start",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Class is live", body = VirtualClassResponse),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found"),
        (status = 409, description = "Class cannot be started from its current status")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn start_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    transition(&state, id, user, ClassAction::Start, "Class started successfully").await
}

#[utoipa::path(
    patch,
    path = "/api/virtual-class/{id}/end",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Class ended and open intervals closed", body = VirtualClassResponse),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found"),
        (status = 409, description = "Class is not live")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn end_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    transition(&state, id, user, ClassAction::End, "Class ended successfully").await
}

#[utoipa::path(
    patch,
    path = "/api/virtual-class/{id}/cancel",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Class cancelled", body = VirtualClassResponse),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found"),
        (status = 409, description = "Class already started or finished")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn cancel_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    transition(&state, id, user, ClassAction::Cancel, "Class cancelled successfully").await
}

#[utoipa::path(
    post,
    path = "/api/virtual-class/{id}/join",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Joined; meeting credentials returned", body = JoinResponse),
        (status = 400, description = "Class not live, already joined, or full"),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn join_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let joined = state.attendance_service.join(id, user.id).await?;
    Ok(Json(ApiResponse::with_message(
        "Joined class successfully",
        joined,
    )))
}

#[utoipa::path(
    post,
    path = "/api/virtual-class/{id}/leave",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Left the class (no-op when not present)"),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn leave_class(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.attendance_service.leave(id, user.id).await?;
    Ok(Json(ApiResponse::message("Left class successfully")))
}
