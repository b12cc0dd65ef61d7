use axum::http::header;
use tower_http::cors::{Any, CorsLayer};

/// Browsers only let scripts read `Content-Disposition` on attendance
/// downloads when it is exposed explicitly.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any)
        .expose_headers([header::CONTENT_DISPOSITION])
}
