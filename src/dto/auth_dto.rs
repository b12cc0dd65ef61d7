use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{student::Student, teacher::Teacher, user::User};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
    pub id: Uuid,
    pub qualifications: String,
    pub subjects: Vec<String>,
    pub assigned_classes: Vec<String>,
    pub lectures_taken: i32,
}

impl From<Teacher> for TeacherProfile {
    fn from(t: Teacher) -> Self {
        Self {
            id: t.id,
            qualifications: t.qualifications,
            subjects: t.subjects,
            assigned_classes: t.assigned_classes,
            lectures_taken: t.lectures_taken,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub enroll_no: String,
    pub standard: String,
    pub parents_contact: String,
    pub address: String,
}

impl From<Student> for StudentProfile {
    fn from(s: Student) -> Self {
        Self {
            id: s.id,
            enroll_no: s.enroll_no,
            standard: s.standard,
            parents_contact: s.parents_contact,
            address: s.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentProfile>,
}
