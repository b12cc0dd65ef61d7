use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::chat_dto::ChatMessageResponse;
use crate::error::{Error, Result};
use crate::models::chat_message::{ChatMessage, ChatMessageWithAuthor, MAX_CHAT_MESSAGE_LEN};
use crate::models::virtual_class::VirtualClass;
use crate::services::virtual_class_service::VirtualClassService;

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
    classes: VirtualClassService,
}

impl ChatService {
    pub fn new(pool: PgPool) -> Self {
        let classes = VirtualClassService::new(pool.clone());
        Self { pool, classes }
    }

    /// The owning teacher and anyone on the roster may read and post.
    async fn ensure_member(&self, class: &VirtualClass, user_id: Uuid) -> Result<()> {
        let (on_roster,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM class_participants WHERE class_id = $1 AND user_id = $2)",
        )
        .bind(class.id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        if on_roster || self.classes.is_owner(class, user_id).await? {
            Ok(())
        } else {
            Err(Error::Forbidden("Not a participant of this class".into()))
        }
    }

    pub async fn post(&self, class_id: Uuid, user_id: Uuid, text: &str) -> Result<ChatMessageResponse> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::BadRequest("Message cannot be empty".into()));
        }
        if text.chars().count() > MAX_CHAT_MESSAGE_LEN {
            return Err(Error::BadRequest(format!(
                "Message must be at most {} characters",
                MAX_CHAT_MESSAGE_LEN
            )));
        }

        let class = self.classes.get_by_id(class_id).await?;
        self.ensure_member(&class, user_id).await?;

        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO class_chat_messages (class_id, user_id, message)
            VALUES ($1, $2, $3)
            RETURNING id, class_id, user_id, message, created_at
            "#,
        )
        .bind(class.id)
        .bind(user_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        let author = self.classes.users().get_by_id(user_id).await?;
        tracing::debug!(class_id = %class.id, user_id = %user_id, "chat message stored");

        Ok(ChatMessageWithAuthor {
            id: message.id,
            class_id: message.class_id,
            user_id: message.user_id,
            full_name: author.full_name,
            message: message.message,
            created_at: message.created_at,
        }
        .into())
    }

    pub async fn list(&self, class_id: Uuid, user_id: Uuid) -> Result<Vec<ChatMessageResponse>> {
        let class = self.classes.get_by_id(class_id).await?;
        self.ensure_member(&class, user_id).await?;

        let messages = sqlx::query_as::<_, ChatMessageWithAuthor>(
            r#"
            SELECT m.id, m.class_id, m.user_id, u.full_name, m.message, m.created_at
            FROM class_chat_messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.class_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(class.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages.into_iter().map(Into::into).collect())
    }
}
