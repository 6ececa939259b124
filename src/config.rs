// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub env: String,
    pub database_url: String,
    pub secret_key: String,
    pub base_url: String,
    pub port: u16,
    /// Directory holding quiz markdown documents.
    pub content_dir: String,
    pub magic_link_ttl_minutes: i64,
    pub rate_limit_per_email_15m: i64,
    pub session_ttl_days: i64,
    /// Emails granted the admin role at sign-in.
    pub admin_emails: Vec<String>,
    pub forwardemail_api_url: String,
    pub forwardemail_user: Option<String>,
    pub forwardemail_pass: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let secret_key = env::var("SECRET_KEY").expect("SECRET_KEY must be set");

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/portal.db?mode=rwc".to_string());

        let admin_emails = env::var("ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            database_url,
            secret_key,
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            content_dir: env::var("CONTENT_DIR").unwrap_or_else(|_| "content".to_string()),
            magic_link_ttl_minutes: env::var("MAGIC_LINK_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            rate_limit_per_email_15m: env::var("RATE_LIMIT_PER_EMAIL_15M")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            admin_emails,
            forwardemail_api_url: env::var("FORWARDEMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.forwardemail.net/v1/emails".to_string()),
            forwardemail_user: env::var("FORWARDEMAIL_USER").ok().filter(|s| !s.is_empty()),
            forwardemail_pass: env::var("FORWARDEMAIL_PASS").ok().filter(|s| !s.is_empty()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|a| a == &email.to_lowercase())
    }
}
