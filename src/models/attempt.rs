// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{question::AnswerOption, user::UserResponse};

/// One student's submission for one day's quiz.
/// At most one exists per (user_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub question1_id: i64,
    pub question2_id: i64,
    pub q1_answer: AnswerOption,
    pub q2_answer: AnswerOption,
    /// Correct answers out of two.
    pub score: i64,
    /// `score * 50`.
    pub percentage: i64,
    /// Seconds, never negative.
    pub time_taken: i64,
    pub timestamp: DateTime<Utc>,
}

/// DTO for submitting today's quiz.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub quiz_id: i64,

    /// User's answers map.
    /// Key: Question ID (i64)
    /// Value: User's selected option
    pub answers: HashMap<i64, AnswerOption>,

    /// Seconds spent, as measured by the client.
    #[serde(default)]
    pub time_taken: i64,
}

/// Attempt history grouped per student, for faculty.
#[derive(Debug, Serialize)]
pub struct StudentPerformance {
    pub student: UserResponse,
    pub attempts: Vec<QuizAttempt>,
}
