// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Question kind. Persisted quiz content may carry kinds this build does not
/// know about; those round-trip through `Unknown` instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    Numeric,
    ShortText,
    Unknown(String),
}

impl QuestionKind {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::Numeric => "numeric",
            QuestionKind::ShortText => "short_text",
            QuestionKind::Unknown(s) => s,
        }
    }

    /// Choice kinds drive option rendering and option-distribution analytics.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }
}

impl From<String> for QuestionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "single_choice" => QuestionKind::SingleChoice,
            "multi_choice" => QuestionKind::MultiChoice,
            "numeric" => QuestionKind::Numeric,
            "short_text" => QuestionKind::ShortText,
            _ => QuestionKind::Unknown(s),
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected answer for a question. Single-valued kinds carry one string,
/// multi-choice carries the full set of correct options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    Single(String),
    Multiple(Vec<String>),
}

/// A student's raw answer to one question, exactly as submitted.
/// Multi-select questions arrive as a list, everything else as a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    One(String),
    Many(Vec<String>),
}

/// One graded item of a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub points: u32,
    /// Options in authoring order; populated only for choice kinds.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Absent key is legal: the question is simply never satisfiable.
    #[serde(default)]
    pub answer_key: Option<AnswerKey>,
}

/// A parsed quiz: ordered questions plus id, title and total point value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub quiz_id: String,
    pub title: String,
    pub questions: Vec<Question>,
    /// Sum of question points unless explicitly overridden by the caller.
    pub total_points: u32,
}

impl Quiz {
    pub fn new(quiz_id: impl Into<String>, title: impl Into<String>, questions: Vec<Question>) -> Self {
        let total_points = questions.iter().map(|q| q.points).sum();
        Self {
            quiz_id: quiz_id.into(),
            title: title.into(),
            questions,
            total_points,
        }
    }
}

/// Quiz metadata row from the 'quizzes' table (no parsed questions).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizMeta {
    pub quiz_id: String,
    pub title: String,
    pub content_path: String,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
    /// 0 means unlimited attempts.
    pub attempts_allowed: i64,
    /// 'draft' or 'published'.
    pub status: String,
    pub total_points: i64,
}

impl QuizMeta {
    pub fn is_published(&self) -> bool {
        self.status == "published"
    }

    /// A quiz accepts submissions only while published and inside its window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !self.is_published() {
            return false;
        }
        if let Some(open_at) = self.open_at {
            if now < open_at {
                return false;
            }
        }
        if let Some(close_at) = self.close_at {
            if now > close_at {
                return false;
            }
        }
        true
    }
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub points: u32,
    pub choices: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            kind: q.kind.clone(),
            prompt: q.prompt.clone(),
            points: q.points,
            choices: q.choices.clone(),
        }
    }
}

/// DTO for an admin creating a quiz entry.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 50))]
    pub quiz_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub content_path: String,
    pub open_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
    #[serde(default = "default_attempts_allowed")]
    pub attempts_allowed: i64,
    pub status: Option<String>,
    #[serde(default)]
    pub total_points: i64,
}

fn default_attempts_allowed() -> i64 {
    1
}
