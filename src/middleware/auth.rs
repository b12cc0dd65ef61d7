use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
}

/// The authenticated caller, placed in request extensions by the auth layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("invalid_token".into()))?;
        let role = claims
            .role
            .parse()
            .map_err(|_| Error::Unauthorized("invalid_token".into()))?;
        Ok(Self { id, role })
    }
}

pub fn issue_token(user_id: Uuid, role: Role) -> Result<String> {
    let config = crate::config::get_config();
    let exp = Utc::now() + chrono::Duration::minutes(config.jwt_ttl_minutes);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp().max(0) as usize,
        role: role.as_str().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))
}

pub fn decode_token(token: &str) -> Result<CurrentUser> {
    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| Error::Unauthorized("invalid_token".into()))?;
    CurrentUser::try_from(data.claims)
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "success": false, "error": code }))).into_response()
}

fn bearer_user(req: &Request) -> std::result::Result<CurrentUser, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };
    decode_token(token.trim()).map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))
}

pub async fn require_bearer_auth(req: Request, next: Next) -> Response {
    require_roles(req, next, &[]).await
}

/// An empty `allowed` list accepts any authenticated role.
pub async fn require_roles(mut req: Request, next: Next, allowed: &[Role]) -> Response {
    let user = match bearer_user(&req) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if !allowed.is_empty() && !allowed.contains(&user.role) {
        tracing::debug!(user_id = %user.id, role = %user.role, "role not allowed on route");
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    req.extensions_mut().insert(user);
    next.run(req).await
}

pub async fn require_teacher(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Teacher]).await
}

pub async fn require_student(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Student]).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Admin]).await
}

pub async fn require_staff(req: Request, next: Next) -> Response {
    require_roles(req, next, &[Role::Teacher, Role::Admin]).await
}
