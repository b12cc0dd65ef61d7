use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::dto::common::not_blank;
use crate::models::student::{FeedbackEntry, ATTENDANCE_STATUSES, EXAM_TYPES};

fn one_of_attendance_statuses(value: &str) -> Result<(), ValidationError> {
    if ATTENDANCE_STATUSES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_attendance_status"))
    }
}

fn one_of_exam_types(value: &str) -> Result<(), ValidationError> {
    if EXAM_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_exam_type"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendancePayload {
    pub date: NaiveDate,
    #[validate(custom(function = "one_of_attendance_statuses"))]
    pub status: String,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "marks_within_total"))]
pub struct RecordPerformancePayload {
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(range(min = 0.0))]
    pub marks: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub total_marks: f64,
    #[validate(custom(function = "one_of_exam_types"))]
    pub exam_type: String,
    pub date: Option<DateTime<Utc>>,
}

fn marks_within_total(payload: &RecordPerformancePayload) -> Result<(), ValidationError> {
    if payload.marks <= payload.total_marks {
        Ok(())
    } else {
        Err(ValidationError::new("marks_exceed_total"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddFeedbackPayload {
    #[validate(length(max = 1000), custom(function = "not_blank"))]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: Uuid,
    pub full_name: String,
    pub standard: String,
    pub attendance_records: usize,
    pub attendance_percentage: f64,
    pub exams: usize,
    pub average_marks: f64,
    /// Newest first.
    pub feedback: Vec<FeedbackEntry>,
}
