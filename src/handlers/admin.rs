// src/handlers/admin.rs

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    analytics::compute_quiz_analytics,
    config::Config,
    error::AppError,
    models::{
        quiz::{CreateQuizRequest, QuizMeta},
        student::CreateStudentRequest,
    },
    quiz_parser::parse_quiz_content,
    store::PortalStore,
    utils::hash::hash_claim_code,
};

/// Roster listing for the admin dashboard.
pub async fn list_students(
    State(store): State<Arc<dyn PortalStore>>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.list_students().await?;
    Ok(Json(students))
}

/// Adds a student to the roster with a freshly generated claim code.
///
/// The plaintext code is returned exactly once, in this response; only its
/// argon2 hash is stored.
pub async fn create_student(
    State(store): State<Arc<dyn PortalStore>>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let student_id = payload.student_id.trim().to_string();
    let claim_code = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    let claim_code_hash = hash_claim_code(&claim_code)?;

    store
        .create_student(&student_id, payload.full_name.trim(), &claim_code_hash)
        .await?;

    tracing::info!(student_id = %student_id, "student added to roster");

    Ok(Json(json!({
        "student_id": student_id,
        "full_name": payload.full_name.trim(),
        "claim_code": claim_code,
    })))
}

/// Registers a quiz's metadata row after checking its markdown parses.
pub async fn create_quiz(
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let path = FsPath::new(&config.content_dir).join(&payload.content_path);
    let content = tokio::fs::read_to_string(&path).await.map_err(|_| {
        AppError::BadRequest(format!(
            "Quiz content file not found: {}",
            payload.content_path
        ))
    })?;

    let parsed = parse_quiz_content(&content, &payload.quiz_id);
    if parsed.questions.is_empty() {
        return Err(AppError::BadRequest(
            "Quiz content contains no valid questions".to_string(),
        ));
    }

    let meta = QuizMeta {
        quiz_id: payload.quiz_id.trim().to_string(),
        title: payload.title.trim().to_string(),
        content_path: payload.content_path.clone(),
        open_at: payload.open_at,
        close_at: payload.close_at,
        attempts_allowed: payload.attempts_allowed,
        status: payload.status.clone().unwrap_or_else(|| "draft".to_string()),
        total_points: payload.total_points,
    };
    store.create_quiz(&meta).await?;

    tracing::info!(quiz_id = %meta.quiz_id, questions = parsed.questions.len(), "quiz created");

    Ok(Json(meta))
}

/// Per-quiz completion overview across the roster.
pub async fn analytics_overview(
    State(store): State<Arc<dyn PortalStore>>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = store.get_quizzes().await?;
    let total_students = store.roster_count().await?;

    let mut rows = Vec::with_capacity(quizzes.len());
    for quiz in quizzes {
        let submissions = store.get_quiz_submissions(&quiz.quiz_id).await?;
        let best = crate::analytics::best_submissions(&submissions);
        rows.push(json!({
            "quiz_id": quiz.quiz_id,
            "title": quiz.title,
            "status": quiz.status,
            "submission_count": submissions.len(),
            "completed_students": best.len(),
            "total_students": total_students,
        }));
    }

    Ok(Json(rows))
}

/// Full per-question analytics for one quiz.
pub async fn quiz_analytics(
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meta = store
        .get_quiz_meta(&quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let path = FsPath::new(&config.content_dir).join(&meta.content_path);
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read quiz content");
        AppError::Internal("Quiz content could not be loaded".to_string())
    })?;
    let mut quiz = parse_quiz_content(&content, &meta.quiz_id);
    if meta.total_points > 0 {
        quiz.total_points = meta.total_points as u32;
    }

    let submissions = store.get_quiz_submissions(&quiz_id).await?;
    let total_students = store.roster_count().await? as usize;

    let analytics = compute_quiz_analytics(&quiz, &submissions, total_students);

    Ok(Json(json!({
        "quiz_id": analytics.quiz_id,
        "title": analytics.title,
        "total_students": analytics.total_students,
        "completed_students": analytics.completed_students,
        "completion_rate": analytics.completion_rate(),
        "avg_score": analytics.avg_score,
        "question_stats": analytics.question_stats,
    })))
}

/// Gradebook: every student crossed with every quiz's best score.
/// Students with no submission for a quiz get a null cell.
pub async fn grades_table(
    State(store): State<Arc<dyn PortalStore>>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.list_students().await?;
    let quizzes = store.get_quizzes().await?;

    let mut best_by_quiz = Vec::with_capacity(quizzes.len());
    for quiz in &quizzes {
        let submissions = store.get_quiz_submissions(&quiz.quiz_id).await?;
        let best: std::collections::BTreeMap<String, (f64, f64)> =
            crate::analytics::best_submissions(&submissions)
                .into_iter()
                .map(|(student_id, sub)| (student_id, (sub.score, sub.max_score)))
                .collect();
        best_by_quiz.push(best);
    }

    let rows: Vec<_> = students
        .iter()
        .map(|student| {
            let grades: serde_json::Map<String, serde_json::Value> = quizzes
                .iter()
                .zip(&best_by_quiz)
                .map(|(quiz, best)| {
                    let cell = match best.get(&student.student_id) {
                        Some((score, max_score)) => json!({
                            "score": score,
                            "max_score": max_score,
                        }),
                        None => serde_json::Value::Null,
                    };
                    (quiz.quiz_id.clone(), cell)
                })
                .collect();

            json!({
                "student_id": student.student_id,
                "full_name": student.full_name,
                "grades": grades,
            })
        })
        .collect();

    Ok(Json(json!({
        "quizzes": quizzes.iter().map(|q| q.quiz_id.clone()).collect::<Vec<_>>(),
        "students": rows,
    })))
}

/// Best score per student for one quiz, for the gradebook view.
pub async fn quiz_grades(
    State(store): State<Arc<dyn PortalStore>>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    store
        .get_quiz_meta(&quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let submissions = store.get_quiz_submissions(&quiz_id).await?;
    let best = crate::analytics::best_submissions(&submissions);

    let rows: Vec<_> = best
        .values()
        .map(|sub| {
            json!({
                "student_id": sub.student_id,
                "email": sub.email,
                "score": sub.score,
                "max_score": sub.max_score,
                "attempt": sub.attempt,
                "submitted_at": sub.submitted_at,
            })
        })
        .collect();

    Ok(Json(rows))
}
