// src/lib.rs

pub mod analytics;
pub mod config;
pub mod email;
pub mod error;
pub mod grading;
pub mod handlers;
pub mod models;
pub mod quiz_parser;
pub mod routes;
pub mod state;
pub mod store;
pub mod tokens;
pub mod utils;

pub use routes::create_router;
