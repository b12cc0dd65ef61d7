use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::chat_message::ChatMessageWithAuthor;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PostChatMessagePayload {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessageWithAuthor> for ChatMessageResponse {
    fn from(m: ChatMessageWithAuthor) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            full_name: m.full_name,
            message: m.message,
            timestamp: m.created_at,
        }
    }
}
