// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use url::Url;
use validator::Validate;

use crate::{
    config::Config,
    email::Mailer,
    error::AppError,
    store::PortalStore,
    tokens::{check_rate_limit, create_magic_token, validate_magic_token},
    utils::jwt::{Claims, sign_session},
};

/// Claim tokens ride the same magic-token table but with a shorter TTL.
const CLAIM_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Deserialize, Validate)]
pub struct RequestLinkRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: String,
}

/// Requests a magic sign-in link.
///
/// Responds identically for known and unknown emails so the endpoint cannot
/// be used to enumerate the roster.
pub async fn request_link(
    State(pool): State<SqlitePool>,
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    State(mailer): State<Arc<Mailer>>,
    Json(payload): Json<RequestLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();

    let (allowed, count) = check_rate_limit(&pool, &email, config.rate_limit_per_email_15m).await?;
    if !allowed {
        store
            .append_magic_link_request(&email, "rate_limited", &format!("count: {count}"), Utc::now())
            .await?;
        return Err(AppError::Forbidden(
            "Too many requests. Please try again in 15 minutes.".to_string(),
        ));
    }

    let token = create_magic_token(&pool, &email, config.magic_link_ttl_minutes).await?;
    let magic_link = build_magic_link(&config, &token)?;

    let result = mailer.send_magic_link(&email, magic_link.as_str()).await;

    let (audit_result, note) = if result.success {
        ("sent", String::new())
    } else {
        // Delivery errors are audited but never revealed to the requester.
        ("error", result.error.unwrap_or_default())
    };
    store
        .append_magic_link_request(&email, audit_result, &note, Utc::now())
        .await?;

    tracing::info!(email, "magic link requested");
    Ok(Json(json!({
        "message": "If this email is registered, you'll receive a sign-in link shortly."
    })))
}

fn build_magic_link(config: &Config, token: &str) -> Result<Url, AppError> {
    let mut link = Url::parse(&config.base_url)
        .map_err(|e| AppError::Internal(format!("invalid base_url: {e}")))?;
    link.set_path("/api/auth/verify");
    link.query_pairs_mut().append_pair("token", token);
    Ok(link)
}

/// Verifies a magic link token.
///
/// For claimed accounts this issues a session token; unclaimed emails get a
/// short-lived claim token to complete account binding instead.
pub async fn verify(
    State(pool): State<SqlitePool>,
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Query(params): Query<VerifyParams>,
) -> Result<impl IntoResponse, AppError> {
    let Some(email) = validate_magic_token(&pool, &params.token).await? else {
        return Err(AppError::Auth(
            "This link is invalid or has expired. Please request a new one.".to_string(),
        ));
    };

    let student = store.get_student_by_email(&email).await?;

    if let Some(student) = student.filter(|s| s.is_claimed()) {
        let role = if config.is_admin_email(&email) {
            "admin"
        } else {
            "student"
        };
        let session = sign_session(
            &student.student_id,
            &email,
            role,
            &config.secret_key,
            config.session_ttl_days,
        )?;

        store.touch_last_login(&student.student_id, Utc::now()).await?;

        tracing::info!(email, student_id = %student.student_id, "login successful");
        return Ok(Json(json!({
            "token": session,
            "type": "Bearer",
            "needs_onboarding": !student.is_onboarded(),
        })));
    }

    // Email not bound to a student yet: issue a claim token.
    let claim_token = create_magic_token(&pool, &email, CLAIM_TOKEN_TTL_MINUTES).await?;

    tracing::info!(email, "email needs to claim an account");
    Ok(Json(json!({
        "claim_token": claim_token,
        "message": "This email is not linked to a student account yet. Use your student ID and claim code to finish signing up.",
    })))
}

/// Returns the signed-in student's account.
pub async fn me(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = store
        .get_student_by_id(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(json!({
        "student": student,
        "role": claims.role,
    })))
}
