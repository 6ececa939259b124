// src/handlers/quiz.rs

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    grading::grade_quiz,
    models::{
        quiz::{PublicQuestion, Quiz, QuizMeta},
        submission::{QuizListEntry, SubmitQuizRequest},
    },
    quiz_parser::parse_quiz_content,
    store::PortalStore,
    utils::jwt::Claims,
};

/// Reads and parses a quiz's markdown document. An explicit total_points on
/// the metadata row overrides the per-question sum.
async fn load_quiz(config: &Config, meta: &QuizMeta) -> Result<Quiz, AppError> {
    let path = FsPath::new(&config.content_dir).join(&meta.content_path);
    let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read quiz content");
        AppError::Internal("Quiz content could not be loaded".to_string())
    })?;

    let mut quiz = parse_quiz_content(&content, &meta.quiz_id);
    if meta.total_points > 0 {
        quiz.total_points = meta.total_points as u32;
    }
    Ok(quiz)
}

fn best_score(submissions: &[crate::models::submission::QuizSubmission]) -> Option<f64> {
    submissions
        .iter()
        .map(|s| s.score)
        .fold(None, |best, score| match best {
            Some(b) if b >= score => Some(b),
            _ => Some(score),
        })
}

/// Lists all quizzes with the student's attempt count and availability.
pub async fn list_quizzes(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = store.get_quizzes().await?;
    let now = Utc::now();

    let mut entries = Vec::with_capacity(quizzes.len());
    for quiz in quizzes {
        let submissions = store
            .get_student_submissions(&claims.sub, &quiz.quiz_id)
            .await?;
        let attempt_count = submissions.len() as i64;

        let can_attempt = quiz.is_open(now)
            && (quiz.attempts_allowed == 0 || attempt_count < quiz.attempts_allowed);
        let attempts_remaining = if quiz.attempts_allowed == 0 {
            None
        } else {
            Some((quiz.attempts_allowed - attempt_count).max(0))
        };

        entries.push(QuizListEntry {
            best_score: best_score(&submissions),
            attempt_count,
            can_attempt,
            attempts_remaining,
            quiz,
        });
    }

    Ok(Json(entries))
}

/// Checks window and attempt-limit policy; returns the attempt number the
/// student is about to use.
async fn check_attempt_allowed(
    store: &Arc<dyn PortalStore>,
    meta: &QuizMeta,
    student_id: &str,
) -> Result<i64, AppError> {
    if !meta.is_open(Utc::now()) {
        return Err(AppError::Forbidden(
            "This quiz is not currently available.".to_string(),
        ));
    }

    let attempt_count = store
        .get_student_submissions(student_id, &meta.quiz_id)
        .await?
        .len() as i64;

    if meta.attempts_allowed > 0 && attempt_count >= meta.attempts_allowed {
        return Err(AppError::Forbidden(format!(
            "You have used all {} attempts for this quiz.",
            meta.attempts_allowed
        )));
    }

    Ok(attempt_count + 1)
}

/// Returns the quiz questions for taking, with answer keys stripped.
pub async fn get_quiz(
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meta = store
        .get_quiz_meta(&quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let attempt_number = check_attempt_allowed(&store, &meta, &claims.sub).await?;
    let quiz = load_quiz(&config, &meta).await?;

    let questions: Vec<PublicQuestion> = quiz.questions.iter().map(PublicQuestion::from).collect();

    Ok(Json(json!({
        "quiz_id": quiz.quiz_id,
        "title": quiz.title,
        "total_points": quiz.total_points,
        "attempt_number": attempt_number,
        "close_at": meta.close_at,
        "questions": questions,
    })))
}

/// Grades a submission and appends it to the history.
///
/// Window and attempt-limit policy is enforced here, before grading; the
/// grading engine itself never rejects an attempt.
pub async fn submit_quiz(
    State(store): State<Arc<dyn PortalStore>>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meta = store
        .get_quiz_meta(&quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let attempt = check_attempt_allowed(&store, &meta, &claims.sub).await?;
    let quiz = load_quiz(&config, &meta).await?;

    let result = grade_quiz(&quiz, &payload.answers);

    let submission = crate::models::submission::QuizSubmission {
        submitted_at: Utc::now(),
        quiz_id: quiz.quiz_id.clone(),
        attempt,
        student_id: claims.sub.clone(),
        email: claims.email.clone(),
        answers_json: serde_json::to_string(&payload.answers)?,
        score: f64::from(result.score),
        max_score: f64::from(result.max_score),
        autograde_json: result.autograde_json()?,
        source: "web".to_string(),
    };
    store.append_submission(&submission).await?;

    tracing::info!(
        student_id = %claims.sub,
        quiz_id = %quiz.quiz_id,
        score = result.score,
        max_score = result.max_score,
        "quiz submitted"
    );

    Ok(Json(json!({
        "quiz_id": quiz.quiz_id,
        "attempt": attempt,
        "score": result.score,
        "max_score": result.max_score,
        "percentage": result.percentage(),
        "questions": result.questions,
    })))
}

/// Returns the student's own submission history for a quiz.
pub async fn my_submissions(
    State(store): State<Arc<dyn PortalStore>>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = store.get_student_submissions(&claims.sub, &quiz_id).await?;
    Ok(Json(submissions))
}
