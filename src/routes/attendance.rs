use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{
    dto::attendance_dto::{
        AttendanceEntry, AttendanceUpdate, BatchAttendanceResponse, ExportFormat, ExportQuery,
    },
    dto::common::ApiResponse,
    error::{Error, Result},
    middleware::auth::CurrentUser,
    services::{
        attendance_service::{BATCH_BODY_REQUIRED, MARK_BODY_REQUIRED},
        export_service::ExportService,
    },
    AppState,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Unreadable override bodies get the same envelope as invalid ones.
fn override_body(
    body: std::result::Result<Json<JsonValue>, JsonRejection>,
    message: &str,
) -> Result<JsonValue> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(Error::PayloadTooLarge(rejection.body_text()))
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "unreadable attendance body");
            Err(Error::BadRequest(message.to_string()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/virtual-class/{id}/attendance",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    responses(
        (status = 200, description = "Roster with attended time", body = [AttendanceEntry]),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn get_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let entries = state.attendance_service.roster(id, user.id).await?;
    Ok(Json(ApiResponse::data(entries)))
}

#[utoipa::path(
    patch,
    path = "/api/virtual-class/{id}/attendance/mark",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    request_body = AttendanceUpdate,
    responses(
        (status = 200, description = "Attendance updated", body = AttendanceEntry),
        (status = 400, description = "studentId and isPresent(boolean) are required"),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Class or student not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn mark_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<JsonValue>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = override_body(body, MARK_BODY_REQUIRED)?;
    let entry = state.attendance_service.mark(id, user.id, &body).await?;
    Ok(Json(ApiResponse::with_message("Attendance updated", entry)))
}

#[utoipa::path(
    patch,
    path = "/api/virtual-class/{id}/attendance/batch",
    params(("id" = Uuid, Path, description = "Virtual class ID")),
    request_body = [AttendanceUpdate],
    responses(
        (status = 200, description = "Per-item results in request order", body = BatchAttendanceResponse),
        (status = 400, description = "Body is not a non-empty array"),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn batch_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<JsonValue>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = override_body(body, BATCH_BODY_REQUIRED)?;
    let result = state.attendance_service.batch(id, user.id, &body).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/virtual-class/{id}/attendance/export",
    params(
        ("id" = Uuid, Path, description = "Virtual class ID"),
        ("format" = Option<String>, Query, description = "csv (default), json or xlsx")
    ),
    responses(
        (status = 200, description = "Attendance file or JSON rows"),
        (status = 400, description = "Unsupported format"),
        (status = 403, description = "Not the owning teacher"),
        (status = 404, description = "Virtual class not found")
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn export_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let format = ExportFormat::parse(query.format.as_deref()).ok_or_else(|| {
        Error::BadRequest("Unsupported export format, use csv, json or xlsx".into())
    })?;
    let (class, rows) = state.attendance_service.export_rows(id, user.id).await?;
    tracing::info!(class_id = %class.id, rows = rows.len(), format = ?format, "attendance exported");

    let response = match format {
        ExportFormat::Json => Json(ApiResponse::data(rows)).into_response(),
        ExportFormat::Csv => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}_attendance.csv\"", class.id),
                ),
            ],
            ExportService::attendance_csv(&rows)?,
        )
            .into_response(),
        ExportFormat::Xlsx => {
            let buffer = ExportService::attendance_xlsx(&class.title, &rows)?;
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}_attendance.xlsx\"", class.id),
                    ),
                ],
                buffer,
            )
                .into_response()
        }
    };
    Ok(response)
}
