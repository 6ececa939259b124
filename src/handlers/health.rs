// src/handlers/health.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

const REQUIRED_TABLES: &[&str] = &[
    "students",
    "quizzes",
    "quiz_submissions",
    "magic_tokens",
    "rate_limits",
];

/// Liveness plus a schema check; degraded returns 503 so load balancers
/// take the instance out of rotation.
pub async fn health_check(State(pool): State<SqlitePool>) -> impl IntoResponse {
    let mut problems: Vec<String> = Vec::new();

    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&pool).await {
        Ok(_) => {
            for table in REQUIRED_TABLES {
                let found: Result<Option<i64>, _> = sqlx::query_scalar(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
                )
                .bind(table)
                .fetch_optional(&pool)
                .await;
                match found {
                    Ok(Some(_)) => {}
                    Ok(None) => problems.push(format!("missing table: {table}")),
                    Err(e) => problems.push(format!("schema check failed: {e}")),
                }
            }
        }
        Err(e) => problems.push(format!("database unreachable: {e}")),
    }

    let status = if problems.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if problems.is_empty() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "problems": problems,
    });

    (status, Json(body))
}
