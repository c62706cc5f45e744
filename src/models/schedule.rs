// src/models/schedule.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::time::validate_hh_mm;

/// Assignment of two questions and a same-day time window to a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSchedule {
    pub id: i64,
    pub quiz_date: NaiveDate,

    /// Zero-padded "HH:MM". Window is inclusive on both ends.
    pub start_time: String,
    pub end_time: String,

    pub question1_id: i64,
    pub question2_id: i64,
}

/// DTO for scheduling a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub quiz_date: NaiveDate,
    #[validate(custom(function = validate_hh_mm))]
    pub start_time: String,
    #[validate(custom(function = validate_hh_mm))]
    pub end_time: String,
    pub question1_id: i64,
    pub question2_id: i64,
    /// Schedule even though another quiz already exists on this date.
    #[serde(default)]
    pub force: bool,
}
