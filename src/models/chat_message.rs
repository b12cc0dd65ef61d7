use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_CHAT_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub class_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Row shape for chat listings, joined with the author's display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageWithAuthor {
    pub id: Uuid,
    pub class_id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
