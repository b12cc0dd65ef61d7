use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::chat_dto::{ChatMessageResponse, PostChatMessagePayload},
    dto::common::ApiResponse,
    error::Result,
    middleware::auth::CurrentUser,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/virtual-class/{id}/chat",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [ChatMessageResponse]),
        (status = 403, description = "Not a participant of this class")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state.chat_service.list(id, user.id).await?;
    Ok(Json(ApiResponse::data(messages)))
}

#[utoipa::path(
    post,
    path = "/api/virtual-class/{id}/chat",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    request_body = PostChatMessagePayload,
    responses(
        (status = 201, description = "Message stored", body = ChatMessageResponse),
        (status = 400, description = "Empty or too long"),
        (status = 403, description = "Not a participant of this class")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostChatMessagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let message = state.chat_service.post(id, user.id, &payload.message).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(message))))
}
