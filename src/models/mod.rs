// src/models/mod.rs

pub mod quiz;
pub mod student;
pub mod submission;
