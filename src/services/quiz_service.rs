use chrono::Utc;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::dto::quiz_dto::{
    CreateQuizPayload, QuizQuestionPayload, QuizResponse, SubmissionResult, SubmissionView,
    SubmitQuizPayload,
};
use crate::dto::virtual_class_dto::PersonRef;
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::quiz::{score_answers, total_marks, Quiz, QuizQuestion, QuizSubmission};
use crate::models::user::Role;
use crate::services::user_service::UserService;

const QUIZ_COLUMNS: &str = "id, title, description, created_by, class_assigned, subject, questions, total_marks, duration_minutes, start_time, end_time, is_active, created_at, updated_at";
const SUBMISSION_COLUMNS: &str =
    "id, quiz_id, student_id, answers, score, percentage, time_taken_minutes, submitted_at";

#[derive(Debug, FromRow)]
struct CountedQuiz {
    #[sqlx(flatten)]
    quiz: Quiz,
    submission_count: i64,
}

#[derive(Debug, FromRow)]
struct StudentQuiz {
    #[sqlx(flatten)]
    quiz: Quiz,
    submitted: bool,
}

#[derive(Debug, FromRow)]
struct SubmissionRow {
    student_id: Uuid,
    full_name: String,
    email: String,
    score: i32,
    percentage: f64,
    time_taken_minutes: Option<i32>,
    submitted_at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
    users: UserService,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        let users = UserService::new(pool.clone());
        Self { pool, users }
    }

    pub async fn get_by_id(&self, quiz_id: Uuid) -> Result<Quiz> {
        sqlx::query_as::<_, Quiz>(&format!("SELECT {} FROM quizzes WHERE id = $1", QUIZ_COLUMNS))
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Quiz not found".into()))
    }

    fn ensure_author(quiz: &Quiz, user_id: Uuid, what: &str) -> Result<()> {
        if quiz.created_by == user_id {
            Ok(())
        } else {
            Err(Error::Forbidden(format!("Not authorized to {} this quiz", what)))
        }
    }

    async fn submission_count(&self, quiz_id: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM quiz_submissions WHERE quiz_id = $1")
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn create(&self, teacher_user_id: Uuid, payload: CreateQuizPayload) -> Result<QuizResponse> {
        self.users
            .teacher_by_user(teacher_user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Teacher profile not found".into()))?;

        let questions: Vec<QuizQuestion> = payload
            .questions
            .into_iter()
            .map(QuizQuestionPayload::into_question)
            .collect();
        let total = total_marks(&questions);
        let description = payload
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            r#"
            INSERT INTO quizzes (
                title, description, created_by, class_assigned, subject, questions,
                total_marks, duration_minutes, start_time, end_time
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        ))
        .bind(payload.title.trim())
        .bind(description)
        .bind(teacher_user_id)
        .bind(payload.class_assigned.trim())
        .bind(payload.subject.trim())
        .bind(sqlx::types::Json(&questions))
        .bind(total)
        .bind(payload.duration)
        .bind(payload.start_time)
        .bind(payload.end_time)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            quiz_id = %quiz.id,
            created_by = %teacher_user_id,
            class_assigned = %quiz.class_assigned,
            questions = questions.len(),
            total_marks = total,
            "quiz created"
        );
        Ok(QuizResponse::new(quiz, questions, true).with_submissions(0))
    }

    pub async fn list_for_teacher(&self, teacher_user_id: Uuid) -> Result<Vec<QuizResponse>> {
        let rows = sqlx::query_as::<_, CountedQuiz>(&format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM quiz_submissions s WHERE s.quiz_id = quizzes.id) AS submission_count
            FROM quizzes
            WHERE created_by = $1
            ORDER BY start_time DESC
            "#,
            QUIZ_COLUMNS
        ))
        .bind(teacher_user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let questions = row.quiz.questions()?;
                Ok(QuizResponse::new(row.quiz, questions, true).with_submissions(row.submission_count))
            })
            .collect()
    }

    /// Active quizzes for the student's class that have not closed yet,
    /// soonest first.
    pub async fn list_available_for_student(&self, student_user_id: Uuid) -> Result<Vec<QuizResponse>> {
        let student = self
            .users
            .student_by_user(student_user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student profile not found".into()))?;

        let rows = sqlx::query_as::<_, StudentQuiz>(&format!(
            r#"
            SELECT {},
                EXISTS (
                    SELECT 1 FROM quiz_submissions s
                    WHERE s.quiz_id = quizzes.id AND s.student_id = $2
                ) AS submitted
            FROM quizzes
            WHERE class_assigned = $1
              AND is_active
              AND end_time >= $3
            ORDER BY start_time ASC
            "#,
            QUIZ_COLUMNS
        ))
        .bind(&student.standard)
        .bind(student_user_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let questions = row.quiz.questions()?;
                Ok(QuizResponse::new(row.quiz, questions, false).with_submitted(row.submitted))
            })
            .collect()
    }

    /// Authors and admins see the answer key. Students of the assigned class
    /// see the questions only.
    pub async fn get_for_viewer(&self, quiz_id: Uuid, viewer: &CurrentUser) -> Result<QuizResponse> {
        let quiz = self.get_by_id(quiz_id).await?;
        let questions = quiz.questions()?;

        if quiz.created_by == viewer.id || viewer.role == Role::Admin {
            let count = self.submission_count(quiz.id).await?;
            return Ok(QuizResponse::new(quiz, questions, true).with_submissions(count));
        }

        if viewer.role == Role::Student {
            let student = self.users.student_by_user(viewer.id).await?;
            if student.map(|s| s.standard) == Some(quiz.class_assigned.clone()) {
                let submitted = self.find_submission(quiz.id, viewer.id).await?.is_some();
                return Ok(QuizResponse::new(quiz, questions, false).with_submitted(submitted));
            }
        }

        Err(Error::Forbidden("Not authorized to view this quiz".into()))
    }

    async fn find_submission(&self, quiz_id: Uuid, student_user_id: Uuid) -> Result<Option<QuizSubmission>> {
        let row = sqlx::query_as::<_, QuizSubmission>(&format!(
            "SELECT {} FROM quiz_submissions WHERE quiz_id = $1 AND student_id = $2",
            SUBMISSION_COLUMNS
        ))
        .bind(quiz_id)
        .bind(student_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Grades and stores a student's single submission. The score is also
    /// recorded as a `quiz` exam result so it shows up in the student's
    /// performance summary.
    pub async fn submit(
        &self,
        quiz_id: Uuid,
        student_user_id: Uuid,
        payload: SubmitQuizPayload,
    ) -> Result<SubmissionResult> {
        let student = self
            .users
            .student_by_user(student_user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Student profile not found".into()))?;
        let quiz = self.get_by_id(quiz_id).await?;

        if student.standard != quiz.class_assigned {
            return Err(Error::Forbidden("Quiz is not assigned to your class".into()));
        }
        let now = Utc::now();
        if !quiz.is_open_at(now) {
            return Err(Error::BadRequest("Quiz is not open for submissions".into()));
        }
        if let Some(taken) = payload.time_taken {
            if taken > quiz.duration_minutes {
                return Err(Error::BadRequest(format!(
                    "timeTaken exceeds the quiz duration of {} minutes",
                    quiz.duration_minutes
                )));
            }
        }

        let questions = quiz.questions()?;
        let scored = score_answers(&questions, &payload.answers);

        let mut tx = self.pool.begin().await?;
        let saved = sqlx::query_as::<_, QuizSubmission>(&format!(
            r#"
            INSERT INTO quiz_submissions
                (quiz_id, student_id, answers, score, percentage, time_taken_minutes, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (quiz_id, student_id) DO NOTHING
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(quiz.id)
        .bind(student_user_id)
        .bind(sqlx::types::Json(&scored.answers))
        .bind(scored.score)
        .bind(scored.percentage)
        .bind(payload.time_taken)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::Conflict("Quiz already submitted".into()))?;

        sqlx::query(
            r#"
            INSERT INTO student_performance (student_id, subject, marks, total_marks, exam_type, date)
            VALUES ($1, $2, $3, $4, 'quiz', $5)
            "#,
        )
        .bind(student.id)
        .bind(&quiz.subject)
        .bind(f64::from(scored.score))
        .bind(f64::from(quiz.total_marks))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            quiz_id = %quiz.id,
            student_id = %student_user_id,
            score = scored.score,
            percentage = scored.percentage,
            "quiz submitted"
        );

        Ok(SubmissionResult {
            quiz_id: quiz.id,
            score: saved.score,
            total_marks: quiz.total_marks,
            percentage: saved.percentage,
            answers: scored.answers,
            time_taken: saved.time_taken_minutes,
            submitted_at: saved.submitted_at,
        })
    }

    pub async fn submissions(&self, quiz_id: Uuid, teacher_user_id: Uuid) -> Result<Vec<SubmissionView>> {
        let quiz = self.get_by_id(quiz_id).await?;
        Self::ensure_author(&quiz, teacher_user_id, "view submissions for")?;

        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT s.student_id, u.full_name, u.email, s.score, s.percentage,
                   s.time_taken_minutes, s.submitted_at
            FROM quiz_submissions s
            JOIN users u ON u.id = s.student_id
            WHERE s.quiz_id = $1
            ORDER BY s.submitted_at ASC
            "#,
        )
        .bind(quiz.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SubmissionView {
                student: PersonRef {
                    id: r.student_id,
                    full_name: r.full_name,
                    email: r.email,
                },
                score: r.score,
                percentage: r.percentage,
                time_taken: r.time_taken_minutes,
                submitted_at: r.submitted_at,
            })
            .collect())
    }

    /// Stops accepting submissions. Closing a closed quiz is a no-op.
    pub async fn close(&self, quiz_id: Uuid, teacher_user_id: Uuid) -> Result<QuizResponse> {
        let quiz = self.get_by_id(quiz_id).await?;
        Self::ensure_author(&quiz, teacher_user_id, "close")?;

        let quiz = if quiz.is_active {
            let closed = sqlx::query_as::<_, Quiz>(&format!(
                "UPDATE quizzes SET is_active = FALSE, updated_at = NOW() WHERE id = $1 RETURNING {}",
                QUIZ_COLUMNS
            ))
            .bind(quiz.id)
            .fetch_one(&self.pool)
            .await?;
            tracing::info!(quiz_id = %closed.id, "quiz closed");
            closed
        } else {
            quiz
        };

        let questions = quiz.questions()?;
        let count = self.submission_count(quiz.id).await?;
        Ok(QuizResponse::new(quiz, questions, true).with_submissions(count))
    }
}
