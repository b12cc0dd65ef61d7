mod common;

use axum::http::{header, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use common::{body_json, ensure_config, json_request, lazy_pool};
use school_backend::{app, middleware::auth::issue_token, models::user::Role, AppState};

fn router() -> axum::Router {
    ensure_config(None);
    app(AppState::new(lazy_pool()))
}

fn token(role: Role) -> String {
    ensure_config(None);
    issue_token(Uuid::new_v4(), role).expect("token")
}

#[tokio::test]
async fn health_reports_ok() {
    let resp = router()
        .oneshot(json_request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_lists_class_routes() {
    let resp = router()
        .oneshot(json_request("GET", "/api/openapi.json", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["paths"]["/api/virtual-class/{id}/attendance/batch"]["patch"].is_object());
    assert!(body["paths"]["/api/quizzes/{id}/submit"]["post"].is_object());
    assert!(body["components"]["schemas"]["SubmissionResult"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = router();
    for (method, uri) in [
        ("GET", "/api/auth/me"),
        ("GET", "/api/virtual-class/teacher/classes"),
        ("POST", "/api/virtual-class/00000000-0000-0000-0000-000000000001/join"),
        ("GET", "/api/virtual-class/00000000-0000-0000-0000-000000000001"),
    ] {
        let resp = app
            .clone()
            .oneshot(json_request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "missing_authorization");
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let resp = router()
        .oneshot(json_request("GET", "/api/auth/me", Some("not-a-jwt"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "invalid_token");
}

#[tokio::test]
async fn roles_are_enforced_before_handlers_run() {
    let app = router();
    let student = token(Role::Student);
    let teacher = token(Role::Teacher);
    let class = "/api/virtual-class/00000000-0000-0000-0000-000000000001";
    let quiz = "/api/quizzes/00000000-0000-0000-0000-000000000003";

    let cases = [
        ("POST", "/api/virtual-class/create".to_string(), &student),
        ("PATCH", format!("{}/start", class), &student),
        ("PATCH", format!("{}/attendance/mark", class), &student),
        ("PATCH", format!("{}/attendance/batch", class), &student),
        ("GET", format!("{}/attendance/export", class), &student),
        ("POST", format!("{}/join", class), &teacher),
        ("GET", "/api/virtual-class/student/available".to_string(), &teacher),
        ("POST", "/api/admin/users".to_string(), &teacher),
        (
            "POST",
            "/api/students/00000000-0000-0000-0000-000000000002/performance".to_string(),
            &student,
        ),
        (
            "POST",
            "/api/students/00000000-0000-0000-0000-000000000002/feedback".to_string(),
            &student,
        ),
        ("POST", "/api/quizzes".to_string(), &student),
        ("GET", "/api/quizzes/teacher".to_string(), &student),
        ("PATCH", format!("{}/close", quiz), &student),
        ("GET", format!("{}/submissions", quiz), &student),
        ("POST", format!("{}/submit", quiz), &teacher),
        ("GET", "/api/quizzes/student/available".to_string(), &teacher),
    ];
    for (method, uri, token) in cases {
        let resp = app
            .clone()
            .oneshot(json_request(method, &uri, Some(token.as_str()), Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body_json(resp).await["error"], "forbidden");
    }
}

#[tokio::test]
async fn login_is_rate_limited() {
    // AUTH_RPS is 2 for this test binary; malformed bodies never reach the database.
    let app = router();
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", None, Some(json!({ "username": "x" }))))
            .await
            .unwrap();
        statuses.push(resp.status());
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            assert_eq!(resp.headers()[header::RETRY_AFTER], "1");
        }
    }
    assert_ne!(statuses[0], StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(statuses[1], StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let teacher = token(Role::Teacher);
    let huge = "x".repeat(school_backend::BODY_LIMIT_BYTES + 1);
    let resp = router()
        .oneshot(json_request(
            "POST",
            "/api/virtual-class/create",
            Some(teacher.as_str()),
            Some(json!({ "title": huge })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unreadable_override_bodies_use_the_error_envelope() {
    let teacher = token(Role::Teacher);
    let class = format!("/api/virtual-class/{}", Uuid::new_v4());

    let cases = [
        (
            format!("{}/attendance/mark", class),
            "text/plain",
            "studentId=1",
            "studentId and isPresent(boolean) are required",
        ),
        (
            format!("{}/attendance/mark", class),
            "application/json",
            "{\"studentId\":",
            "studentId and isPresent(boolean) are required",
        ),
        (
            format!("{}/attendance/batch", class),
            "application/json",
            "[{",
            "Request body must be a non-empty array of attendance updates",
        ),
    ];

    for (uri, content_type, raw, expected) in cases {
        let req = axum::http::Request::builder()
            .method("PATCH")
            .uri(&uri)
            .header("authorization", format!("Bearer {}", teacher))
            .header(header::CONTENT_TYPE, content_type)
            .body(axum::body::Body::from(raw))
            .unwrap();
        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} {}", uri, content_type);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], expected);
    }
}
