// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod claim;
pub mod health;
pub mod onboarding;
pub mod quiz;
