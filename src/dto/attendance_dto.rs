use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use super::virtual_class_dto::PersonRef;

/// One attendance correction, `{ "studentId": "<user id>", "isPresent": bool }`.
///
/// Request bodies are parsed by hand so a malformed batch item can be
/// reported next to the valid ones instead of rejecting the whole body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    pub student_id: Uuid,
    pub is_present: bool,
}

pub const INVALID_UPDATE_REASON: &str = "Invalid studentId or isPresent";

impl AttendanceUpdate {
    pub fn from_value(value: &JsonValue) -> Result<Self, String> {
        let student_id = value
            .get("studentId")
            .and_then(JsonValue::as_str)
            .and_then(|s| Uuid::parse_str(s.trim()).ok());
        let is_present = value.get("isPresent").and_then(JsonValue::as_bool);
        match (student_id, is_present) {
            (Some(student_id), Some(is_present)) => Ok(Self {
                student_id,
                is_present,
            }),
            _ => Err(INVALID_UPDATE_REASON.to_string()),
        }
    }

    /// The raw `studentId` of an item, echoed back in batch results even
    /// when it failed to parse.
    pub fn raw_student_id(value: &JsonValue) -> Option<String> {
        match value.get("studentId") {
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub student_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchAttendanceResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student: PersonRef,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_present: bool,
    pub attended_seconds: i64,
}

/// Flat row shape used by every export format.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceExportRow {
    pub student_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub joined_at: String,
    pub left_at: String,
    pub is_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("csv") => Some(Self::Csv),
            Some("json") => Some(Self::Json),
            Some("xlsx") => Some(Self::Xlsx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_requires_uuid_and_boolean() {
        let id = Uuid::new_v4();
        let ok = AttendanceUpdate::from_value(&json!({ "studentId": id.to_string(), "isPresent": false }));
        assert_eq!(
            ok,
            Ok(AttendanceUpdate {
                student_id: id,
                is_present: false
            })
        );

        for bad in [
            json!({ "studentId": id.to_string(), "isPresent": "yes" }),
            json!({ "studentId": "s1", "isPresent": true }),
            json!({ "isPresent": true }),
            json!(null),
        ] {
            assert_eq!(
                AttendanceUpdate::from_value(&bad),
                Err(INVALID_UPDATE_REASON.to_string())
            );
        }
    }

    #[test]
    fn raw_student_id_is_echoed() {
        assert_eq!(
            AttendanceUpdate::raw_student_id(&json!({ "studentId": "s1" })),
            Some("s1".to_string())
        );
        assert_eq!(AttendanceUpdate::raw_student_id(&json!({ "studentId": "" })), None);
        assert_eq!(AttendanceUpdate::raw_student_id(&json!(7)), None);
    }

    #[test]
    fn export_format_defaults_to_csv() {
        assert_eq!(ExportFormat::parse(None), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse(Some("JSON")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse(Some("xlsx")), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse(Some("pdf")), None);
    }
}
