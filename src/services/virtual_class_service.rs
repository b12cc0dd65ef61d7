use chrono::{Duration, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::dto::virtual_class_dto::{
    CreateVirtualClassPayload, ParticipantView, PersonRef, TeacherSummary, VirtualClassResponse,
};
use crate::error::{Error, Result};
use crate::models::participant::{Participant, Roster, SessionWindow};
use crate::models::teacher::Teacher;
use crate::models::virtual_class::{
    plan_transition, ClassAction, ClassStatus, Transition, VirtualClass,
    DEFAULT_DURATION_MINUTES, DEFAULT_MAX_PARTICIPANTS,
};
use crate::services::user_service::UserService;
use crate::utils::token::{generate_meeting_id, generate_meeting_password};

pub(crate) const CLASS_COLUMNS: &str = "id, title, description, teacher_id, subject, grade, scheduled_at, duration_minutes, meeting_id, meeting_password, status, max_participants, is_recorded, recording_url, started_at, ended_at, created_at, updated_at";
const PARTICIPANT_COLUMNS: &str = "id, class_id, user_id, joined_at, left_at, is_present, attended_seconds, interval_started_at, marked_by, created_at, updated_at";

/// Students see classes scheduled up to this long ago.
const AVAILABLE_LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Clone, FromRow)]
struct PersonRow {
    id: Uuid,
    full_name: String,
    email: String,
}

#[derive(Debug, Clone, FromRow)]
struct TeacherRow {
    id: Uuid,
    user_id: Uuid,
    qualifications: String,
    subjects: Vec<String>,
    full_name: String,
    email: String,
}

pub fn session_window(class: &VirtualClass) -> SessionWindow {
    SessionWindow {
        started_at: class.started_at,
        ended_at: class.ended_at,
    }
}

/// Locks the class row for the rest of the transaction. Roster writes for a
/// class always go through this lock, so student joins and teacher
/// overrides on the same class are applied one at a time.
pub(crate) async fn lock_class(conn: &mut PgConnection, class_id: Uuid) -> Result<VirtualClass> {
    sqlx::query_as::<_, VirtualClass>(&format!(
        "SELECT {} FROM virtual_classes WHERE id = $1 FOR UPDATE",
        CLASS_COLUMNS
    ))
    .bind(class_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| Error::NotFound("Virtual class not found".into()))
}

pub(crate) async fn load_roster(conn: &mut PgConnection, class_id: Uuid) -> Result<Roster> {
    let participants = sqlx::query_as::<_, Participant>(&format!(
        "SELECT {} FROM class_participants WHERE class_id = $1 ORDER BY created_at ASC, id ASC",
        PARTICIPANT_COLUMNS
    ))
    .bind(class_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Roster::new(class_id, participants))
}

pub(crate) async fn save_roster(conn: &mut PgConnection, roster: &Roster) -> Result<()> {
    for p in roster.changed() {
        sqlx::query(
            r#"
            INSERT INTO class_participants
                (id, class_id, user_id, joined_at, left_at, is_present, attended_seconds,
                 interval_started_at, marked_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (class_id, user_id) DO UPDATE SET
                joined_at = EXCLUDED.joined_at,
                left_at = EXCLUDED.left_at,
                is_present = EXCLUDED.is_present,
                attended_seconds = EXCLUDED.attended_seconds,
                interval_started_at = EXCLUDED.interval_started_at,
                marked_by = EXCLUDED.marked_by,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(p.id)
        .bind(p.class_id)
        .bind(p.user_id)
        .bind(p.joined_at)
        .bind(p.left_at)
        .bind(p.is_present)
        .bind(p.attended_seconds)
        .bind(p.interval_started_at)
        .bind(p.marked_by)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct VirtualClassService {
    pool: PgPool,
    users: UserService,
}

impl VirtualClassService {
    pub fn new(pool: PgPool) -> Self {
        let users = UserService::new(pool.clone());
        Self { pool, users }
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    async fn teacher_profile(&self, user_id: Uuid) -> Result<Teacher> {
        self.users
            .teacher_by_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Teacher profile not found".into()))
    }

    pub async fn get_by_id(&self, class_id: Uuid) -> Result<VirtualClass> {
        sqlx::query_as::<_, VirtualClass>(&format!(
            "SELECT {} FROM virtual_classes WHERE id = $1",
            CLASS_COLUMNS
        ))
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Virtual class not found".into()))
    }

    /// Fails with 403 unless `user_id` is the teacher who owns the class.
    pub async fn ensure_owner(&self, class: &VirtualClass, user_id: Uuid, what: &str) -> Result<()> {
        match self.users.teacher_by_user(user_id).await? {
            Some(teacher) if teacher.id == class.teacher_id => Ok(()),
            _ => Err(Error::Forbidden(format!("Not authorized to {} this class", what))),
        }
    }

    pub async fn is_owner(&self, class: &VirtualClass, user_id: Uuid) -> Result<bool> {
        Ok(self
            .users
            .teacher_by_user(user_id)
            .await?
            .map(|t| t.id == class.teacher_id)
            .unwrap_or(false))
    }

    pub async fn create(
        &self,
        teacher_user_id: Uuid,
        payload: CreateVirtualClassPayload,
    ) -> Result<VirtualClassResponse> {
        let teacher = self.teacher_profile(teacher_user_id).await?;
        let description = payload
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let class = sqlx::query_as::<_, VirtualClass>(&format!(
            r#"
            INSERT INTO virtual_classes (
                title, description, teacher_id, subject, grade, scheduled_at,
                duration_minutes, meeting_id, meeting_password, status,
                max_participants, is_recorded
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'scheduled', $10, $11)
            RETURNING {}
            "#,
            CLASS_COLUMNS
        ))
        .bind(payload.title.trim())
        .bind(description)
        .bind(teacher.id)
        .bind(payload.subject.trim())
        .bind(payload.grade.trim())
        .bind(payload.scheduled_at)
        .bind(payload.duration.unwrap_or(DEFAULT_DURATION_MINUTES))
        .bind(generate_meeting_id())
        .bind(generate_meeting_password())
        .bind(payload.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS))
        .bind(payload.is_recorded)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(class_id = %class.id, teacher_id = %teacher.id, scheduled_at = %class.scheduled_at, "virtual class created");
        let summary = self.teacher_summary(class.teacher_id).await?;
        Ok(VirtualClassResponse::new(class, true).with_teacher(summary))
    }

    pub async fn list_for_teacher(&self, teacher_user_id: Uuid) -> Result<Vec<VirtualClassResponse>> {
        let teacher = self.teacher_profile(teacher_user_id).await?;
        let classes = sqlx::query_as::<_, VirtualClass>(&format!(
            "SELECT {} FROM virtual_classes WHERE teacher_id = $1 ORDER BY scheduled_at DESC",
            CLASS_COLUMNS
        ))
        .bind(teacher.id)
        .fetch_all(&self.pool)
        .await?;

        let summary = self.teacher_summary(teacher.id).await?;
        let mut out = Vec::with_capacity(classes.len());
        for class in classes {
            let participants = self.participant_views(&class).await?;
            out.push(
                VirtualClassResponse::new(class, true)
                    .with_teacher(summary.clone())
                    .with_participants(participants),
            );
        }
        Ok(out)
    }

    pub async fn list_available_for_student(
        &self,
        student_user_id: Uuid,
    ) -> Result<Vec<VirtualClassResponse>> {
        let student = self
            .users
            .student_by_user(student_user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student profile not found".into()))?;

        let since = Utc::now() - Duration::hours(AVAILABLE_LOOKBACK_HOURS);
        let classes = sqlx::query_as::<_, VirtualClass>(&format!(
            r#"
            SELECT {} FROM virtual_classes
            WHERE grade = $1
              AND status IN ('scheduled', 'live')
              AND scheduled_at >= $2
            ORDER BY scheduled_at ASC
            "#,
            CLASS_COLUMNS
        ))
        .bind(&student.standard)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries: HashMap<Uuid, Option<TeacherSummary>> = HashMap::new();
        let mut out = Vec::with_capacity(classes.len());
        for class in classes {
            if !summaries.contains_key(&class.teacher_id) {
                let s = self.teacher_summary(class.teacher_id).await?;
                summaries.insert(class.teacher_id, s);
            }
            let teacher = summaries.get(&class.teacher_id).cloned().flatten();
            out.push(VirtualClassResponse::new(class, false).with_teacher(teacher));
        }
        Ok(out)
    }

    /// Class details for any authenticated user. The meeting password is
    /// only shown to the owner and to students on the roster.
    pub async fn get_detail(&self, class_id: Uuid, viewer: Uuid) -> Result<VirtualClassResponse> {
        let class = self.get_by_id(class_id).await?;
        let participants = self.participant_views(&class).await?;
        let on_roster = participants.iter().any(|p| p.user.id == viewer);
        let show_password = on_roster || self.is_owner(&class, viewer).await?;
        let teacher = self.teacher_summary(class.teacher_id).await?;
        Ok(VirtualClassResponse::new(class, show_password)
            .with_teacher(teacher)
            .with_participants(participants))
    }

    /// Applies a lifecycle action for the owning teacher. Ending a class also
    /// closes every running presence interval at the end time.
    pub async fn transition(
        &self,
        class_id: Uuid,
        teacher_user_id: Uuid,
        action: ClassAction,
    ) -> Result<(VirtualClassResponse, bool)> {
        let mut tx = self.pool.begin().await?;
        let class = lock_class(&mut *tx, class_id).await?;
        self.ensure_owner(&class, teacher_user_id, action.verb()).await?;

        let current = class.status()?;
        let class = match plan_transition(current, action)? {
            Transition::AlreadyThere => {
                tx.rollback().await?;
                tracing::debug!(class_id = %class.id, status = %current, "transition repeated, nothing to do");
                return Ok((self.owner_view(class).await?, false));
            }
            Transition::Apply(next) => {
                let now = Utc::now();
                let updated = sqlx::query_as::<_, VirtualClass>(&format!(
                    r#"
                    UPDATE virtual_classes SET
                        status = $2,
                        started_at = CASE WHEN $2 = 'live' THEN $3 ELSE started_at END,
                        ended_at = CASE WHEN $2 = 'ended' THEN $3 ELSE ended_at END,
                        updated_at = $3
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    CLASS_COLUMNS
                ))
                .bind(class.id)
                .bind(next.as_str())
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;

                if next == ClassStatus::Ended {
                    let mut roster = load_roster(&mut *tx, class.id).await?;
                    let closed = roster.close_all(&session_window(&updated), now);
                    save_roster(&mut *tx, &roster).await?;
                    tracing::info!(class_id = %class.id, closed, "closed open presence intervals");
                }
                if next == ClassStatus::Live {
                    sqlx::query(
                        "UPDATE teachers SET lectures_taken = lectures_taken + 1, updated_at = NOW() WHERE id = $1",
                    )
                    .bind(class.teacher_id)
                    .execute(&mut *tx)
                    .await?;
                }

                tx.commit().await?;
                tracing::info!(class_id = %class.id, from = %current, to = %next, "class status changed");
                updated
            }
        };
        Ok((self.owner_view(class).await?, true))
    }

    async fn owner_view(&self, class: VirtualClass) -> Result<VirtualClassResponse> {
        let participants = self.participant_views(&class).await?;
        let teacher = self.teacher_summary(class.teacher_id).await?;
        Ok(VirtualClassResponse::new(class, true)
            .with_teacher(teacher)
            .with_participants(participants))
    }

    pub async fn participants(&self, class_id: Uuid) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, Participant>(&format!(
            "SELECT {} FROM class_participants WHERE class_id = $1 ORDER BY created_at ASC, id ASC",
            PARTICIPANT_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn people(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PersonRef>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, PersonRow>(
            "SELECT id, full_name, email FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.id,
                    PersonRef {
                        id: r.id,
                        full_name: r.full_name,
                        email: r.email,
                    },
                )
            })
            .collect())
    }

    pub async fn participant_views(&self, class: &VirtualClass) -> Result<Vec<ParticipantView>> {
        let participants = self.participants(class.id).await?;
        let ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();
        let people = self.people(&ids).await?;
        let window = session_window(class);
        let now = Utc::now();
        Ok(participants
            .iter()
            .map(|p| {
                let user = people.get(&p.user_id).cloned().unwrap_or(PersonRef {
                    id: p.user_id,
                    full_name: String::new(),
                    email: String::new(),
                });
                ParticipantView::new(p, user, &window, now)
            })
            .collect())
    }

    async fn teacher_summary(&self, teacher_id: Uuid) -> Result<Option<TeacherSummary>> {
        let row = sqlx::query_as::<_, TeacherRow>(
            r#"
            SELECT t.id, t.user_id, t.qualifications, t.subjects, u.full_name, u.email
            FROM teachers t
            JOIN users u ON u.id = t.user_id
            WHERE t.id = $1
            "#,
        )
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| TeacherSummary {
            id: r.id,
            user_id: r.user_id,
            full_name: r.full_name,
            email: r.email,
            qualifications: r.qualifications,
            subjects: r.subjects,
        }))
    }
}
