use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::dto::attendance_dto::{
    AttendanceEntry, AttendanceExportRow, AttendanceUpdate, BatchAttendanceResponse,
    BatchItemResult,
};
use crate::dto::virtual_class_dto::{JoinResponse, PersonRef};
use crate::error::{Error, Result};
use crate::models::participant::{JoinRejection, Participant, SessionWindow};
use crate::models::virtual_class::{ClassStatus, VirtualClass};
use crate::services::virtual_class_service::{
    load_roster, lock_class, save_roster, session_window, VirtualClassService,
};
use crate::utils::time::to_iso;

pub const MARK_BODY_REQUIRED: &str = "studentId and isPresent(boolean) are required";
pub const BATCH_BODY_REQUIRED: &str = "Request body must be a non-empty array of attendance updates";
const STUDENT_NOT_FOUND: &str = "Student not found";

#[derive(Clone)]
pub struct AttendanceService {
    pool: PgPool,
    classes: VirtualClassService,
}

impl AttendanceService {
    pub fn new(pool: PgPool) -> Self {
        let classes = VirtualClassService::new(pool.clone());
        Self { pool, classes }
    }

    /// A student's own join. Runs under the class row lock so the capacity
    /// check and the roster write see the same roster.
    pub async fn join(&self, class_id: Uuid, user_id: Uuid) -> Result<JoinResponse> {
        let mut tx = self.pool.begin().await?;
        let class = lock_class(&mut *tx, class_id).await?;
        if class.status()? != ClassStatus::Live {
            return Err(Error::BadRequest("Class is not currently live".into()));
        }

        let mut roster = load_roster(&mut *tx, class.id).await?;
        let max = usize::try_from(class.max_participants).unwrap_or(0);
        match roster.join(user_id, max, Utc::now()) {
            Ok(()) => {
                save_roster(&mut *tx, &roster).await?;
                tx.commit().await?;
                tracing::info!(class_id = %class.id, user_id = %user_id, "student joined");
            }
            Err(JoinRejection::AlreadyJoined) => {
                return Err(Error::BadRequest("Already joined this class".into()));
            }
            Err(JoinRejection::ClassFull) => {
                return Err(Error::BadRequest(format!(
                    "Class is full ({} participants)",
                    class.max_participants
                )));
            }
        }

        Ok(JoinResponse {
            meeting_id: class.meeting_id,
            meeting_password: class.meeting_password,
            title: class.title,
        })
    }

    /// Closes the caller's running interval, if any. Always succeeds for an
    /// existing class.
    pub async fn leave(&self, class_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let class = lock_class(&mut *tx, class_id).await?;
        let mut roster = load_roster(&mut *tx, class.id).await?;
        let changed = roster.leave(user_id, &session_window(&class), Utc::now());
        if changed {
            save_roster(&mut *tx, &roster).await?;
            tx.commit().await?;
            tracing::info!(class_id = %class.id, user_id = %user_id, "student left");
        } else {
            tx.rollback().await?;
        }
        Ok(changed)
    }

    pub async fn roster(&self, class_id: Uuid, teacher_user_id: Uuid) -> Result<Vec<AttendanceEntry>> {
        let class = self.classes.get_by_id(class_id).await?;
        self.classes
            .ensure_owner(&class, teacher_user_id, "view attendance for")
            .await?;
        self.entries(&class).await
    }

    async fn entries(&self, class: &VirtualClass) -> Result<Vec<AttendanceEntry>> {
        let participants = self.classes.participants(class.id).await?;
        let ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();
        let people = self.classes.people(&ids).await?;
        let window = session_window(class);
        let now = Utc::now();
        Ok(participants
            .iter()
            .map(|p| {
                let student = people.get(&p.user_id).cloned().unwrap_or(PersonRef {
                    id: p.user_id,
                    full_name: String::new(),
                    email: String::new(),
                });
                entry(p, student, &window, now)
            })
            .collect())
    }

    /// Users among `ids` that have a student profile.
    async fn known_students(&self, ids: &[Uuid]) -> Result<HashSet<Uuid>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM students WHERE user_id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Teacher override for one student.
    pub async fn mark(
        &self,
        class_id: Uuid,
        teacher_user_id: Uuid,
        body: &JsonValue,
    ) -> Result<AttendanceEntry> {
        let update = AttendanceUpdate::from_value(body)
            .map_err(|_| Error::BadRequest(MARK_BODY_REQUIRED.into()))?;

        let mut tx = self.pool.begin().await?;
        let class = lock_class(&mut *tx, class_id).await?;
        self.classes
            .ensure_owner(&class, teacher_user_id, "mark attendance for")
            .await?;
        if !self
            .known_students(&[update.student_id])
            .await?
            .contains(&update.student_id)
        {
            return Err(Error::NotFound(STUDENT_NOT_FOUND.into()));
        }

        let mut roster = load_roster(&mut *tx, class.id).await?;
        let window = session_window(&class);
        let now = Utc::now();
        let participant = roster
            .mark(update.student_id, update.is_present, teacher_user_id, &window, now)
            .clone();
        save_roster(&mut *tx, &roster).await?;
        tx.commit().await?;

        tracing::info!(
            class_id = %class.id,
            user_id = %update.student_id,
            is_present = update.is_present,
            marked_by = %teacher_user_id,
            "attendance marked"
        );

        let people = self.classes.people(&[update.student_id]).await?;
        let student = people.get(&update.student_id).cloned().unwrap_or(PersonRef {
            id: update.student_id,
            full_name: String::new(),
            email: String::new(),
        });
        Ok(entry(&participant, student, &window, now))
    }

    /// Applies every valid item in one transaction. Invalid items are
    /// reported in place and do not abort the rest.
    pub async fn batch(
        &self,
        class_id: Uuid,
        teacher_user_id: Uuid,
        body: &JsonValue,
    ) -> Result<BatchAttendanceResponse> {
        let items = match body.as_array() {
            Some(items) if !items.is_empty() => items,
            _ => return Err(Error::BadRequest(BATCH_BODY_REQUIRED.into())),
        };

        let mut tx = self.pool.begin().await?;
        let class = lock_class(&mut *tx, class_id).await?;
        self.classes
            .ensure_owner(&class, teacher_user_id, "mark attendance for")
            .await?;

        let parsed: Vec<std::result::Result<AttendanceUpdate, String>> =
            items.iter().map(AttendanceUpdate::from_value).collect();
        let ids: Vec<Uuid> = parsed
            .iter()
            .filter_map(|p| p.as_ref().ok().map(|u| u.student_id))
            .collect();
        let students = self.known_students(&ids).await?;

        let mut roster = load_roster(&mut *tx, class.id).await?;
        let window = session_window(&class);
        let now = Utc::now();
        let mut results = Vec::with_capacity(items.len());
        let mut applied = 0usize;

        for (raw, update) in items.iter().zip(parsed) {
            let student_id = AttendanceUpdate::raw_student_id(raw);
            let outcome = match update {
                Ok(u) if students.contains(&u.student_id) => {
                    roster.mark(u.student_id, u.is_present, teacher_user_id, &window, now);
                    applied += 1;
                    Ok(())
                }
                Ok(_) => Err(STUDENT_NOT_FOUND.to_string()),
                Err(reason) => Err(reason),
            };
            results.push(match outcome {
                Ok(()) => BatchItemResult {
                    student_id,
                    success: true,
                    reason: None,
                },
                Err(reason) => BatchItemResult {
                    student_id,
                    success: false,
                    reason: Some(reason),
                },
            });
        }

        save_roster(&mut *tx, &roster).await?;
        tx.commit().await?;

        let failed = results.len() - applied;
        tracing::info!(class_id = %class.id, applied, failed, marked_by = %teacher_user_id, "attendance batch applied");

        Ok(BatchAttendanceResponse {
            success: true,
            message: format!("Attendance updated for {} of {} students", applied, results.len()),
            results,
        })
    }

    pub async fn export_rows(
        &self,
        class_id: Uuid,
        teacher_user_id: Uuid,
    ) -> Result<(VirtualClass, Vec<AttendanceExportRow>)> {
        let class = self.classes.get_by_id(class_id).await?;
        self.classes
            .ensure_owner(&class, teacher_user_id, "export attendance for")
            .await?;
        let rows = self
            .entries(&class)
            .await?
            .into_iter()
            .map(|e| AttendanceExportRow {
                student_id: e.student.id,
                full_name: e.student.full_name,
                email: e.student.email,
                joined_at: e.joined_at.map(to_iso).unwrap_or_default(),
                left_at: e.left_at.map(to_iso).unwrap_or_default(),
                is_present: e.is_present,
            })
            .collect();
        Ok((class, rows))
    }
}

fn entry(
    p: &Participant,
    student: PersonRef,
    window: &SessionWindow,
    now: chrono::DateTime<Utc>,
) -> AttendanceEntry {
    AttendanceEntry {
        student,
        joined_at: p.joined_at,
        left_at: p.left_at,
        is_present: p.is_present,
        attended_seconds: p.attended_seconds_at(window, now),
    }
}
