use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::{
    dto::admin_dto::{CreateUserPayload, CreatedUser},
    dto::common::ApiResponse,
    error::Result,
    middleware::auth::CurrentUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = CreatedUser),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Username, email or enrollment number taken")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let created = state.user_service.create_user(payload).await?;
    tracing::info!(admin_id = %admin.id, user_id = %created.user.id, "account provisioned");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User created successfully", created)),
    ))
}
