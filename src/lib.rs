pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_admin, require_bearer_auth, require_staff, require_student, require_teacher},
    cors::permissive_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::services::{
    attendance_service::AttendanceService, chat_service::ChatService, quiz_service::QuizService,
    signaling_service::SignalingHub, student_service::StudentService, user_service::UserService,
    virtual_class_service::VirtualClassService,
};

pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub student_service: StudentService,
    pub virtual_class_service: VirtualClassService,
    pub attendance_service: AttendanceService,
    pub chat_service: ChatService,
    pub quiz_service: QuizService,
    pub signaling_hub: SignalingHub,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let user_service = UserService::new(pool.clone());
        let student_service = StudentService::new(pool.clone());
        let virtual_class_service = VirtualClassService::new(pool.clone());
        let attendance_service = AttendanceService::new(pool.clone());
        let chat_service = ChatService::new(pool.clone());
        let quiz_service = QuizService::new(pool.clone());

        Self {
            pool,
            user_service,
            student_service,
            virtual_class_service,
            attendance_service,
            chat_service,
            quiz_service,
            signaling_hub: SignalingHub::new(),
        }
    }
}

/// Every HTTP and WebSocket route with its auth and rate-limit layers.
/// Needs the global config to be initialized.
pub fn app(state: AppState) -> Router {
    let config = config::get_config();

    let auth_api = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .layer(from_fn_with_state(
            RateLimiter::new("auth", config.auth_rps),
            rps_middleware,
        ));

    let account_api = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route_layer(from_fn(require_bearer_auth))
        .merge(
            Router::new()
                .route("/api/admin/users", post(routes::admin::create_user))
                .route_layer(from_fn(require_admin)),
        );

    let students_api = Router::new()
        .route(
            "/api/students/:id/attendance",
            post(routes::students::record_attendance),
        )
        .route(
            "/api/students/:id/performance",
            post(routes::students::record_performance),
        )
        .route(
            "/api/students/:id/feedback",
            post(routes::students::add_feedback),
        )
        .route_layer(from_fn(require_staff))
        .merge(
            Router::new()
                .route("/api/students/:id/summary", get(routes::students::summary))
                .route_layer(from_fn(require_bearer_auth)),
        );

    let teacher_api = Router::new()
        .route(
            "/api/virtual-class/create",
            post(routes::virtual_class::create_class),
        )
        .route(
            "/api/virtual-class/teacher/classes",
            get(routes::virtual_class::teacher_classes),
        )
        .route(
            "/api/virtual-class/:id/start",
            patch(routes::virtual_class::start_class),
        )
        .route(
            "/api/virtual-class/:id/end",
            patch(routes::virtual_class::end_class),
        )
        .route(
            "/api/virtual-class/:id/cancel",
            patch(routes::virtual_class::cancel_class),
        )
        .route(
            "/api/virtual-class/:id/attendance",
            get(routes::attendance::get_attendance),
        )
        .route(
            "/api/virtual-class/:id/attendance/export",
            get(routes::attendance::export_attendance),
        )
        .route(
            "/api/virtual-class/:id/attendance/mark",
            patch(routes::attendance::mark_attendance),
        )
        .route(
            "/api/virtual-class/:id/attendance/batch",
            patch(routes::attendance::batch_attendance),
        )
        .route("/api/quizzes", post(routes::quiz::create_quiz))
        .route("/api/quizzes/teacher", get(routes::quiz::teacher_quizzes))
        .route(
            "/api/quizzes/:id/submissions",
            get(routes::quiz::quiz_submissions),
        )
        .route("/api/quizzes/:id/close", patch(routes::quiz::close_quiz))
        .route_layer(from_fn(require_teacher));

    let student_api = Router::new()
        .route(
            "/api/virtual-class/student/available",
            get(routes::virtual_class::student_available),
        )
        .route(
            "/api/virtual-class/:id/join",
            post(routes::virtual_class::join_class),
        )
        .route(
            "/api/quizzes/student/available",
            get(routes::quiz::student_available),
        )
        .route("/api/quizzes/:id/submit", post(routes::quiz::submit_quiz))
        .route_layer(from_fn(require_student));

    let member_api = Router::new()
        .route("/api/virtual-class/:id", get(routes::virtual_class::get_class))
        .route(
            "/api/virtual-class/:id/leave",
            post(routes::virtual_class::leave_class),
        )
        .route(
            "/api/virtual-class/:id/chat",
            get(routes::chat::list_messages).post(routes::chat::post_message),
        )
        .route("/api/quizzes/:id", get(routes::quiz::get_quiz))
        .route_layer(from_fn(require_bearer_auth));

    let api = account_api
        .merge(students_api)
        .merge(teacher_api)
        .merge(student_api)
        .merge(member_api)
        .layer(from_fn_with_state(
            RateLimiter::new("api", config.api_rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/openapi.json", get(routes::openapi::openapi_json))
        .route("/ws/virtual-class", get(routes::signaling::relay_socket))
        .merge(auth_api)
        .merge(api)
        .with_state(state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}
