// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{config::Config, email::Mailer, store::PortalStore};

#[derive(Clone)]
pub struct AppState {
    /// Ephemeral security state (magic tokens, rate limits).
    pub pool: SqlitePool,
    /// System of record: roster, quizzes, submission history.
    pub store: Arc<dyn PortalStore>,
    pub config: Config,
    pub mailer: Arc<Mailer>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<dyn PortalStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Mailer> {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}
