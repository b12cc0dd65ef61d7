use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::admin_dto::{CreateUserPayload, CreatedUser};
use crate::dto::auth_dto::{MeResponse, UserSummary};
use crate::error::{Error, Result};
use crate::models::{
    student::Student,
    teacher::Teacher,
    user::{Role, User},
};
use crate::utils::crypto::{hash_password, verify_password};

const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, role, is_active, created_at, updated_at";
const TEACHER_COLUMNS: &str =
    "id, user_id, qualifications, subjects, assigned_classes, lectures_taken, created_at, updated_at";
const STUDENT_COLUMNS: &str =
    "id, user_id, enroll_no, standard, parents_contact, address, created_at, updated_at";

const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    /// Unknown users, inactive users and wrong passwords all fail the same way.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let Some(user) = self.find_by_username(username).await? else {
            return Err(Error::Unauthorized(BAD_CREDENTIALS.into()));
        };
        if !user.is_active || !verify_password(password, &user.password_hash) {
            tracing::info!(username = %user.username, "login rejected");
            return Err(Error::Unauthorized(BAD_CREDENTIALS.into()));
        }
        Ok(user)
    }

    pub async fn teacher_by_user(&self, user_id: Uuid) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {} FROM teachers WHERE user_id = $1",
            TEACHER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(teacher)
    }

    pub async fn student_by_user(&self, user_id: Uuid) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE user_id = $1",
            STUDENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    pub async fn student_by_id(&self, student_id: Uuid) -> Result<Student> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Student not found".into()))
    }

    pub async fn me(&self, user_id: Uuid) -> Result<MeResponse> {
        let user = self.get_by_id(user_id).await?;
        let (teacher, student) = match user.role() {
            Some(Role::Teacher) => (self.teacher_by_user(user.id).await?, None),
            Some(Role::Student) => (None, self.student_by_user(user.id).await?),
            _ => (None, None),
        };
        Ok(MeResponse {
            user: UserSummary::from(&user),
            teacher: teacher.map(Into::into),
            student: student.map(Into::into),
        })
    }

    /// Creates the account and its role profile atomically.
    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<CreatedUser> {
        let password_hash = hash_password(&payload.password)?;
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(payload.username.trim())
        .bind(payload.email.trim().to_lowercase())
        .bind(payload.full_name.trim())
        .bind(&password_hash)
        .bind(payload.role.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let teacher = match &payload.teacher {
            Some(profile) if payload.role == Role::Teacher => Some(
                sqlx::query_as::<_, Teacher>(&format!(
                    r#"
                    INSERT INTO teachers (user_id, qualifications, subjects, assigned_classes)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {}
                    "#,
                    TEACHER_COLUMNS
                ))
                .bind(user.id)
                .bind(profile.qualifications.trim())
                .bind(&profile.subjects)
                .bind(&profile.assigned_classes)
                .fetch_one(&mut *tx)
                .await?,
            ),
            _ => None,
        };

        let student = match &payload.student {
            Some(profile) if payload.role == Role::Student => Some(
                sqlx::query_as::<_, Student>(&format!(
                    r#"
                    INSERT INTO students (user_id, enroll_no, standard, parents_contact, address)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {}
                    "#,
                    STUDENT_COLUMNS
                ))
                .bind(user.id)
                .bind(profile.enroll_no.trim())
                .bind(profile.standard.trim())
                .bind(profile.parents_contact.trim())
                .bind(profile.address.trim())
                .fetch_one(&mut *tx)
                .await?,
            ),
            _ => None,
        };

        tx.commit().await?;
        tracing::info!(user_id = %user.id, role = %payload.role, "user created");

        Ok(CreatedUser {
            user: UserSummary::from(&user),
            teacher: teacher.map(Into::into),
            student: student.map(Into::into),
        })
    }

    /// Creates the configured bootstrap admin unless the username is taken.
    pub async fn ensure_admin(&self, username: &str, email: &str, password: &str) -> Result<bool> {
        if self.find_by_username(username).await?.is_some() {
            return Ok(false);
        }
        let password_hash = hash_password(password)?;
        sqlx::query(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4, 'admin')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(email.to_lowercase())
        .bind("Administrator")
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }
}
