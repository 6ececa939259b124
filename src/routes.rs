// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, claim, health, onboarding, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

pub fn create_router(state: AppState) -> Router {
    // Open endpoints: magic-link flow and liveness.
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/request-link", post(auth::request_link))
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/claim", post(claim::claim));

    // Everything here requires a valid session.
    let student_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/onboarding", post(onboarding::submit_onboarding))
        .route(
            "/api/profile",
            get(onboarding::get_profile).put(onboarding::update_profile),
        )
        .route("/api/quizzes", get(quiz::list_quizzes))
        .route("/api/quizzes/{quiz_id}", get(quiz::get_quiz))
        .route("/api/quizzes/{quiz_id}/submit", post(quiz::submit_quiz))
        .route(
            "/api/quizzes/{quiz_id}/submissions",
            get(quiz::my_submissions),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Admin routes layer both middlewares; admin_middleware reads the
    // claims auth_middleware injects, so order matters.
    let admin_routes = Router::new()
        .route(
            "/api/admin/students",
            get(admin::list_students).post(admin::create_student),
        )
        .route("/api/admin/quizzes", post(admin::create_quiz))
        .route("/api/admin/analytics", get(admin::analytics_overview))
        .route(
            "/api/admin/analytics/{quiz_id}",
            get(admin::quiz_analytics),
        )
        .route("/api/admin/grades", get(admin::grades_table))
        .route("/api/admin/grades/{quiz_id}", get(admin::quiz_grades))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(student_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
