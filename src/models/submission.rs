// src/models/submission.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::quiz::{Answer, QuizMeta};

/// One persisted quiz attempt, exactly as graded at submission time.
/// Rows are append-only; regrading appends a new attempt instead of mutating.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub submitted_at: DateTime<Utc>,
    pub quiz_id: String,
    pub attempt: i64,
    pub student_id: String,
    pub email: String,
    /// Raw answers as submitted, serialized JSON.
    pub answers_json: String,
    pub score: f64,
    pub max_score: f64,
    /// Per-question grading detail, serialized JSON. Analytics reads this
    /// back instead of re-grading.
    pub autograde_json: String,
    pub source: String,
}

/// DTO for submitting a quiz attempt. Question ids missing from the map are
/// graded as unanswered.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<String, Answer>,
}

/// One entry of the student-facing quiz list.
#[derive(Debug, Serialize)]
pub struct QuizListEntry {
    #[serde(flatten)]
    pub quiz: QuizMeta,
    pub attempt_count: i64,
    pub best_score: Option<f64>,
    pub can_attempt: bool,
    /// None when attempts are unlimited.
    pub attempts_remaining: Option<i64>,
}
