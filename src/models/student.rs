// src/models/student.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents one roster entry from the 'students' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub full_name: String,

    /// Argon2 hash of the claim code handed out to the student.
    /// Skipped during serialization to prevent leaking it.
    #[serde(skip)]
    pub claim_code_hash: String,

    /// Bound email address; set once the account is claimed.
    pub email: Option<String>,

    /// 'active' or 'inactive'. Inactive students cannot claim or sign in.
    pub status: String,

    pub preferred_name: Option<String>,
    pub pronouns: Option<String>,
    pub cs_experience: Option<String>,
    pub class_goals: Option<String>,
    pub support_request: Option<String>,
    pub hobbies: Option<String>,

    pub claimed_at: Option<DateTime<Utc>>,
    pub onboarded_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn is_claimed(&self) -> bool {
        self.email.is_some() && self.claimed_at.is_some()
    }

    pub fn is_onboarded(&self) -> bool {
        self.onboarded_at.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.preferred_name.as_deref().unwrap_or(&self.full_name)
    }
}

/// Profile fields a student may edit. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    pub preferred_name: Option<String>,
    #[validate(length(max = 50))]
    pub pronouns: Option<String>,
    #[validate(length(max = 2000))]
    pub cs_experience: Option<String>,
    #[validate(length(max = 2000))]
    pub class_goals: Option<String>,
    #[validate(length(max = 2000))]
    pub support_request: Option<String>,
    #[validate(length(max = 2000))]
    pub hobbies: Option<String>,
}

/// DTO for binding an email to a student account.
#[derive(Debug, Deserialize, Validate)]
pub struct ClaimRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1, max = 50))]
    pub student_id: String,
    #[validate(length(min = 4, max = 50))]
    pub claim_code: String,
}

/// DTO for an admin adding a roster entry.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 50))]
    pub student_id: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
}
