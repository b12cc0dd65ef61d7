use axum::{extract::State, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::{
    dto::auth_dto::{LoginPayload, LoginResponse, MeResponse, UserSummary},
    dto::common::ApiResponse,
    error::{Error, Result},
    middleware::auth::{issue_token, CurrentUser},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .authenticate(&payload.username, &payload.password)
        .await?;
    let role = user
        .role()
        .ok_or_else(|| Error::Internal(format!("user {} has unknown role {}", user.id, user.role)))?;
    let token = issue_token(user.id, role)?;
    tracing::info!(user_id = %user.id, role = %role, "user logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserSummary::from(&user),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user with profile", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let me = state.user_service.me(user.id).await?;
    Ok(Json(ApiResponse::data(me)))
}
