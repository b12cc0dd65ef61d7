use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::models::user::Role;

use super::auth_dto::{StudentProfile, TeacherProfile, UserSummary};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTeacherProfile {
    #[validate(length(min = 1))]
    pub qualifications: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub assigned_classes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewStudentProfile {
    #[validate(length(min = 1))]
    pub enroll_no: String,
    #[validate(length(min = 1))]
    pub standard: String,
    #[validate(length(min = 1))]
    pub parents_contact: String,
    #[validate(length(min = 1))]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_profile_matches_role"))]
pub struct CreateUserPayload {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: Role,
    #[validate(nested)]
    pub teacher: Option<NewTeacherProfile>,
    #[validate(nested)]
    pub student: Option<NewStudentProfile>,
}

fn validate_profile_matches_role(payload: &CreateUserPayload) -> Result<(), ValidationError> {
    let ok = match payload.role {
        Role::Admin => payload.teacher.is_none() && payload.student.is_none(),
        Role::Teacher => payload.teacher.is_some() && payload.student.is_none(),
        Role::Student => payload.student.is_some() && payload.teacher.is_none(),
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("profile_must_match_role"))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentProfile>,
}
