// src/handlers/onboarding.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::student::ProfileUpdate,
    store::PortalStore,
    utils::{html::clean_text, jwt::Claims},
};

fn sanitized(update: ProfileUpdate) -> ProfileUpdate {
    let clean = |field: Option<String>| field.map(|v| clean_text(v.trim()));
    ProfileUpdate {
        preferred_name: clean(update.preferred_name),
        pronouns: clean(update.pronouns),
        cs_experience: clean(update.cs_experience),
        class_goals: clean(update.class_goals),
        support_request: clean(update.support_request),
        hobbies: clean(update.hobbies),
    }
}

/// Completes onboarding: saves the profile, records the raw response for the
/// instructor, and stamps the account as onboarded.
pub async fn submit_onboarding(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let update = sanitized(payload);

    if !store.update_profile(&claims.sub, &update).await? {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    let response_json = serde_json::to_string(&update)?;
    store
        .append_onboarding_response(&claims.sub, &claims.email, &response_json, Utc::now())
        .await?;

    let first_time = store.mark_onboarded(&claims.sub, Utc::now()).await?;

    tracing::info!(student_id = %claims.sub, first_time, "onboarding submitted");
    Ok(Json(json!({ "status": "ok" })))
}

/// Returns the signed-in student's profile.
pub async fn get_profile(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = store
        .get_student_by_id(&claims.sub)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(student))
}

/// Updates profile fields. Absent fields are left untouched.
pub async fn update_profile(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !store.update_profile(&claims.sub, &sanitized(payload)).await? {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    Ok(Json(json!({ "status": "ok" })))
}
