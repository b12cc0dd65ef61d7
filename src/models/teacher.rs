use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: Uuid,
    pub user_id: Uuid,
    pub qualifications: String,
    pub subjects: Vec<String>,
    pub assigned_classes: Vec<String>,
    pub lectures_taken: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
