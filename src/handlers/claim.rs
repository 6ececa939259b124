// src/handlers/claim.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::student::ClaimRequest,
    store::PortalStore,
    tokens::validate_magic_token,
    utils::{hash::verify_claim_code, jwt::sign_session},
};

/// Claims a student account: binds the token's email to the roster entry
/// identified by student id + claim code, then issues a session.
///
/// Wrong ids and wrong codes share one error message so the endpoint cannot
/// be used to probe which student ids exist.
pub async fn claim(
    State(pool): State<SqlitePool>,
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Json(payload): Json<ClaimRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let Some(email) = validate_magic_token(&pool, &payload.token).await? else {
        return Err(AppError::Auth(
            "This link is invalid or has expired. Please request a new sign-in link.".to_string(),
        ));
    };

    let student_id = payload.student_id.trim();
    let claim_code = payload.claim_code.trim().to_uppercase();

    let invalid = || {
        AppError::Auth(
            "Invalid student ID or claim code. Please check your information and try again."
                .to_string(),
        )
    };

    let Some(student) = store.get_student_by_id(student_id).await? else {
        tracing::warn!(student_id, "claim attempt for non-existent student");
        return Err(invalid());
    };

    if student.email.is_some() {
        tracing::warn!(student_id, "claim attempt for already claimed student");
        return Err(AppError::Conflict(
            "This student account has already been claimed. If this is your account, try signing in with your email."
                .to_string(),
        ));
    }

    if !verify_claim_code(&claim_code, &student.claim_code_hash)? {
        tracing::warn!(student_id, "invalid claim code");
        return Err(invalid());
    }

    if student.status != "active" {
        tracing::warn!(student_id, status = %student.status, "claim attempt for inactive student");
        return Err(AppError::Forbidden(
            "This student account is not active. Please contact your instructor.".to_string(),
        ));
    }

    if !store.claim_student(student_id, &email, Utc::now()).await? {
        return Err(AppError::Conflict(
            "This student account has already been claimed.".to_string(),
        ));
    }

    let role = if config.is_admin_email(&email) {
        "admin"
    } else {
        "student"
    };
    let session = sign_session(
        student_id,
        &email,
        role,
        &config.secret_key,
        config.session_ttl_days,
    )?;

    tracing::info!(student_id, email, "student claimed account");
    Ok(Json(json!({
        "token": session,
        "type": "Bearer",
        "needs_onboarding": true,
    })))
}
