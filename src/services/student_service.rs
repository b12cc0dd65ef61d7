use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::student_dto::{
    AddFeedbackPayload, RecordAttendancePayload, RecordPerformancePayload, StudentSummary,
};
use crate::error::Result;
use crate::models::student::{
    attendance_percentage, average_marks, AttendanceRecord, FeedbackEntry, PerformanceRecord,
};
use crate::services::user_service::UserService;

#[derive(Clone)]
pub struct StudentService {
    pool: PgPool,
    users: UserService,
}

impl StudentService {
    pub fn new(pool: PgPool) -> Self {
        let users = UserService::new(pool.clone());
        Self { pool, users }
    }

    pub async fn record_attendance(
        &self,
        student_id: Uuid,
        payload: RecordAttendancePayload,
        marked_by: Uuid,
    ) -> Result<AttendanceRecord> {
        self.users.student_by_id(student_id).await?;
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO student_attendance (student_id, date, status, subject, marked_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, student_id, date, status, subject, marked_by, created_at
            "#,
        )
        .bind(student_id)
        .bind(payload.date)
        .bind(&payload.status)
        .bind(payload.subject.as_deref().map(str::trim))
        .bind(marked_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn record_performance(
        &self,
        student_id: Uuid,
        payload: RecordPerformancePayload,
    ) -> Result<PerformanceRecord> {
        self.users.student_by_id(student_id).await?;
        let record = sqlx::query_as::<_, PerformanceRecord>(
            r#"
            INSERT INTO student_performance (student_id, subject, marks, total_marks, exam_type, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, student_id, subject, marks, total_marks, exam_type, date, created_at
            "#,
        )
        .bind(student_id)
        .bind(payload.subject.trim())
        .bind(payload.marks)
        .bind(payload.total_marks)
        .bind(&payload.exam_type)
        .bind(payload.date.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn add_feedback(
        &self,
        student_id: Uuid,
        payload: AddFeedbackPayload,
        given_by: Uuid,
    ) -> Result<FeedbackEntry> {
        self.users.student_by_id(student_id).await?;
        let entry = sqlx::query_as::<_, FeedbackEntry>(
            r#"
            INSERT INTO student_feedback (student_id, comment, given_by)
            VALUES ($1, $2, $3)
            RETURNING id, student_id, comment, given_by, date
            "#,
        )
        .bind(student_id)
        .bind(payload.comment.trim())
        .bind(given_by)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(student_id = %student_id, given_by = %given_by, "feedback recorded");
        Ok(entry)
    }

    pub async fn summary(&self, student_id: Uuid) -> Result<StudentSummary> {
        let student = self.users.student_by_id(student_id).await?;
        let user = self.users.get_by_id(student.user_id).await?;

        let attendance = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, student_id, date, status, subject, marked_by, created_at
            FROM student_attendance
            WHERE student_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let performance = sqlx::query_as::<_, PerformanceRecord>(
            r#"
            SELECT id, student_id, subject, marks, total_marks, exam_type, date, created_at
            FROM student_performance
            WHERE student_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let feedback = sqlx::query_as::<_, FeedbackEntry>(
            r#"
            SELECT id, student_id, comment, given_by, date
            FROM student_feedback
            WHERE student_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(StudentSummary {
            student_id,
            full_name: user.full_name,
            standard: student.standard,
            attendance_records: attendance.len(),
            attendance_percentage: attendance_percentage(&attendance),
            exams: performance.len(),
            average_marks: average_marks(&performance),
            feedback,
        })
    }
}
