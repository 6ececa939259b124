// src/store/mod.rs

pub mod db;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::quiz::QuizMeta;
use crate::models::student::{ProfileUpdate, Student};
use crate::models::submission::QuizSubmission;

pub use db::DbStore;

/// Data access for the portal's system of record: roster, quiz metadata and
/// submission history. Handlers depend on this trait only, so the backing
/// store can change without touching the grading or analytics code.
///
/// Submission and audit writes are append-only.
#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn get_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError>;
    async fn get_student_by_id(&self, student_id: &str) -> Result<Option<Student>, AppError>;
    async fn list_students(&self) -> Result<Vec<Student>, AppError>;
    async fn roster_count(&self) -> Result<i64, AppError>;

    async fn create_student(
        &self,
        student_id: &str,
        full_name: &str,
        claim_code_hash: &str,
    ) -> Result<(), AppError>;

    /// Binds an email to an unclaimed student account.
    /// Returns false if the account does not exist or is already claimed.
    async fn claim_student(
        &self,
        student_id: &str,
        email: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn update_profile(
        &self,
        student_id: &str,
        update: &ProfileUpdate,
    ) -> Result<bool, AppError>;
    async fn mark_onboarded(&self, student_id: &str, when: DateTime<Utc>) -> Result<bool, AppError>;
    async fn touch_last_login(&self, student_id: &str, when: DateTime<Utc>) -> Result<(), AppError>;

    async fn get_quizzes(&self) -> Result<Vec<QuizMeta>, AppError>;
    async fn get_quiz_meta(&self, quiz_id: &str) -> Result<Option<QuizMeta>, AppError>;
    async fn create_quiz(&self, quiz: &QuizMeta) -> Result<(), AppError>;

    async fn get_student_submissions(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<QuizSubmission>, AppError>;
    async fn get_quiz_submissions(&self, quiz_id: &str) -> Result<Vec<QuizSubmission>, AppError>;
    async fn append_submission(&self, submission: &QuizSubmission) -> Result<(), AppError>;

    async fn append_onboarding_response(
        &self,
        student_id: &str,
        email: &str,
        response_json: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn append_magic_link_request(
        &self,
        email: &str,
        result: &str,
        note: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError>;
}
