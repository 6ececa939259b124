// src/store/db.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::quiz::QuizMeta;
use crate::models::student::{ProfileUpdate, Student};
use crate::models::submission::QuizSubmission;
use crate::store::PortalStore;

const STUDENT_COLUMNS: &str = "student_id, full_name, claim_code_hash, email, status, \
     preferred_name, pronouns, cs_experience, class_goals, support_request, hobbies, \
     claimed_at, onboarded_at, last_login_at";

const SUBMISSION_COLUMNS: &str = "submitted_at, quiz_id, attempt, student_id, email, \
     answers_json, score, max_score, autograde_json, source";

/// SQLite-backed implementation of [`PortalStore`].
pub struct DbStore {
    pool: SqlitePool,
}

impl DbStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortalStore for DbStore {
    async fn get_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = ?"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    async fn get_student_by_id(&self, student_id: &str) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?"
        ))
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY student_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn roster_count(&self) -> Result<i64, AppError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn create_student(
        &self,
        student_id: &str,
        full_name: &str,
        claim_code_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO students (student_id, full_name, claim_code_hash, status)
             VALUES (?, ?, ?, 'active')",
        )
        .bind(student_id)
        .bind(full_name)
        .bind(claim_code_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Conflict(format!("Student '{student_id}' already exists"))
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }

    async fn claim_student(
        &self,
        student_id: &str,
        email: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // Guarded update: refuses to overwrite an existing binding.
        let result = sqlx::query(
            "UPDATE students SET email = ?, claimed_at = ?
             WHERE student_id = ? AND email IS NULL",
        )
        .bind(email.to_lowercase())
        .bind(when)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        student_id: &str,
        update: &ProfileUpdate,
    ) -> Result<bool, AppError> {
        let exists: Option<(String,)> =
            sqlx::query_as("SELECT student_id FROM students WHERE student_id = ?")
                .bind(student_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let fields = [
            ("preferred_name", &update.preferred_name),
            ("pronouns", &update.pronouns),
            ("cs_experience", &update.cs_experience),
            ("class_goals", &update.class_goals),
            ("support_request", &update.support_request),
            ("hobbies", &update.hobbies),
        ];

        for (column, value) in fields {
            if let Some(value) = value {
                sqlx::query(&format!("UPDATE students SET {column} = ? WHERE student_id = ?"))
                    .bind(value)
                    .bind(student_id)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(true)
    }

    async fn mark_onboarded(
        &self,
        student_id: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE students SET onboarded_at = ? WHERE student_id = ? AND onboarded_at IS NULL",
        )
        .bind(when)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(
        &self,
        student_id: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE students SET last_login_at = ? WHERE student_id = ?")
            .bind(when)
            .bind(student_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_quizzes(&self) -> Result<Vec<QuizMeta>, AppError> {
        let quizzes = sqlx::query_as::<_, QuizMeta>(
            "SELECT quiz_id, title, content_path, open_at, close_at,
                    attempts_allowed, status, total_points
             FROM quizzes ORDER BY quiz_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes)
    }

    async fn get_quiz_meta(&self, quiz_id: &str) -> Result<Option<QuizMeta>, AppError> {
        let quiz = sqlx::query_as::<_, QuizMeta>(
            "SELECT quiz_id, title, content_path, open_at, close_at,
                    attempts_allowed, status, total_points
             FROM quizzes WHERE quiz_id = ?",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    async fn create_quiz(&self, quiz: &QuizMeta) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO quizzes (quiz_id, title, content_path, open_at, close_at,
                                  attempts_allowed, status, total_points)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quiz.quiz_id)
        .bind(&quiz.title)
        .bind(&quiz.content_path)
        .bind(quiz.open_at)
        .bind(quiz.close_at)
        .bind(quiz.attempts_allowed)
        .bind(&quiz.status)
        .bind(quiz.total_points)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Conflict(format!("Quiz '{}' already exists", quiz.quiz_id))
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }

    async fn get_student_submissions(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<QuizSubmission>, AppError> {
        let submissions = sqlx::query_as::<_, QuizSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions
             WHERE student_id = ? AND quiz_id = ? ORDER BY id"
        ))
        .bind(student_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    async fn get_quiz_submissions(&self, quiz_id: &str) -> Result<Vec<QuizSubmission>, AppError> {
        let submissions = sqlx::query_as::<_, QuizSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE quiz_id = ? ORDER BY id"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(submissions)
    }

    async fn append_submission(&self, submission: &QuizSubmission) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO quiz_submissions ({SUBMISSION_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(submission.submitted_at)
        .bind(&submission.quiz_id)
        .bind(submission.attempt)
        .bind(&submission.student_id)
        .bind(&submission.email)
        .bind(&submission.answers_json)
        .bind(submission.score)
        .bind(submission.max_score)
        .bind(&submission.autograde_json)
        .bind(&submission.source)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            student_id = %submission.student_id,
            quiz_id = %submission.quiz_id,
            attempt = submission.attempt,
            "appended quiz submission"
        );
        Ok(())
    }

    async fn append_onboarding_response(
        &self,
        student_id: &str,
        email: &str,
        response_json: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO onboarding_responses (submitted_at, student_id, email, response_json)
             VALUES (?, ?, ?, ?)",
        )
        .bind(when)
        .bind(student_id)
        .bind(email)
        .bind(response_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_magic_link_request(
        &self,
        email: &str,
        result: &str,
        note: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO magic_link_requests (requested_at, email, result, note)
             VALUES (?, ?, ?, ?)",
        )
        .bind(when)
        .bind(email)
        .bind(result)
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
