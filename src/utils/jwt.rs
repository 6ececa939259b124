// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const SESSION_COOKIE: &str = "session";

/// Session claims. Issued after a magic link is verified or an account is
/// claimed; there is no password login.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - stores the student id.
    pub sub: String,
    pub email: String,
    /// 'student' or 'admin'.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a session JWT for a student.
pub fn sign_session(
    student_id: &str,
    email: &str,
    role: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::days(ttl_days)).timestamp() as usize;

    let claims = Claims {
        sub: student_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verifies and decodes a session JWT.
pub fn verify_session(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Auth("Invalid session".to_string()))?;

    Ok(token_data.claims)
}

/// Pulls the session token from either the Authorization header or the
/// session cookie set by browser clients.
fn extract_token(req: &Request<Body>) -> Option<String> {
    if let Some(header_value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = header_value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())?;

    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Axum middleware: authentication.
///
/// Validates the session token and injects `Claims` into the request
/// extensions for handlers to use. Returns 401 otherwise.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_session(&token, &config.secret_key) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum middleware: admin authorization.
///
/// Must be used AFTER `auth_middleware`. Checks the injected `Claims` for
/// the 'admin' role.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_round_trips() {
        let token = sign_session("s123", "a@example.edu", "student", "secret", 7).unwrap();
        let claims = verify_session(&token, "secret").unwrap();

        assert_eq!(claims.sub, "s123");
        assert_eq!(claims.email, "a@example.edu");
        assert_eq!(claims.role, "student");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_session("s123", "a@example.edu", "student", "secret", 7).unwrap();
        assert!(verify_session(&token, "other-secret").is_err());
    }
}
