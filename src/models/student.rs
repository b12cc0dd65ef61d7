use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub enroll_no: String,
    pub standard: String,
    pub parents_contact: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    pub status: String,
    pub subject: Option<String>,
    pub marked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub marks: f64,
    pub total_marks: f64,
    pub exam_type: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A staff comment on a student.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    pub comment: String,
    pub given_by: Option<Uuid>,
    pub date: DateTime<Utc>,
}

pub const ATTENDANCE_STATUSES: [&str; 3] = ["present", "absent", "late"];
pub const EXAM_TYPES: [&str; 4] = ["quiz", "test", "midterm", "final"];

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of `present` records, in percent with one decimal. Late and absent
/// records both count against it.
pub fn attendance_percentage(records: &[AttendanceRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let present = records.iter().filter(|r| r.status == "present").count();
    round_one_decimal(present as f64 / records.len() as f64 * 100.0)
}

/// Mean of each exam's percentage score, one decimal.
pub fn average_marks(records: &[PerformanceRecord]) -> f64 {
    let scored: Vec<f64> = records
        .iter()
        .filter(|r| r.total_marks > 0.0)
        .map(|r| r.marks / r.total_marks * 100.0)
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    round_one_decimal(scored.iter().sum::<f64>() / scored.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendance(status: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status: status.to_string(),
            subject: None,
            marked_by: None,
            created_at: Utc::now(),
        }
    }

    fn exam(marks: f64, total: f64) -> PerformanceRecord {
        PerformanceRecord {
            id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            subject: "Math".into(),
            marks,
            total_marks: total,
            exam_type: "quiz".into(),
            date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn attendance_percentage_counts_only_present() {
        assert_eq!(attendance_percentage(&[]), 0.0);
        let records = vec![
            attendance("present"),
            attendance("late"),
            attendance("absent"),
        ];
        assert_eq!(attendance_percentage(&records), 33.3);
    }

    #[test]
    fn average_marks_normalizes_each_exam() {
        assert_eq!(average_marks(&[]), 0.0);
        let records = vec![exam(45.0, 50.0), exam(7.0, 10.0)];
        assert_eq!(average_marks(&records), 80.0);
    }
}
