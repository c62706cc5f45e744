// src/services/mod.rs

pub mod attempt;
pub mod report;
pub mod scheduler;
