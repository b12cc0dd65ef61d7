use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::common::not_blank;
use crate::models::participant::{Participant, SessionWindow};
use crate::models::virtual_class::VirtualClass;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVirtualClassPayload {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(custom(function = "not_blank"))]
    pub grade: String,
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 480))]
    pub duration: Option<i32>,
    #[validate(range(min = 1, max = 500))]
    pub max_participants: Option<i32>,
    #[serde(default)]
    pub is_recorded: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub qualifications: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user: PersonRef,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_present: bool,
    pub attended_seconds: i64,
}

impl ParticipantView {
    pub fn new(
        participant: &Participant,
        user: PersonRef,
        window: &SessionWindow,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user,
            joined_at: participant.joined_at,
            left_at: participant.left_at,
            is_present: participant.is_present,
            attended_seconds: participant.attended_seconds_at(window, now),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualClassResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub teacher_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherSummary>,
    pub subject: String,
    pub grade: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration: i32,
    pub meeting_id: String,
    /// Only included for the owning teacher and for students who joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_password: Option<String>,
    pub status: String,
    pub max_participants: i32,
    pub is_recorded: bool,
    pub recording_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VirtualClassResponse {
    pub fn new(class: VirtualClass, show_password: bool) -> Self {
        Self {
            id: class.id,
            title: class.title,
            description: class.description,
            teacher_id: class.teacher_id,
            teacher: None,
            subject: class.subject,
            grade: class.grade,
            scheduled_at: class.scheduled_at,
            duration: class.duration_minutes,
            meeting_id: class.meeting_id,
            meeting_password: show_password.then_some(class.meeting_password),
            status: class.status,
            max_participants: class.max_participants,
            is_recorded: class.is_recorded,
            recording_url: class.recording_url,
            started_at: class.started_at,
            ended_at: class.ended_at,
            participants: Vec::new(),
            created_at: class.created_at,
            updated_at: class.updated_at,
        }
    }

    pub fn with_teacher(mut self, teacher: Option<TeacherSummary>) -> Self {
        self.teacher = teacher;
        self
    }

    pub fn with_participants(mut self, participants: Vec<ParticipantView>) -> Self {
        self.participants = participants;
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub meeting_id: String,
    pub meeting_password: String,
    pub title: String,
}
