// src/store/mod.rs

//! Record Store: persistence for users, questions, schedules and attempts.
//!
//! Business rules live in `services`; the store only guarantees ids,
//! uniqueness and referential integrity. Two backends implement [`Store`]:
//! [`MemoryStore`] (process map with an optional JSON snapshot file) and
//! [`SqliteStore`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{
    attempt::QuizAttempt,
    question::{AnswerOption, Question},
    schedule::QuizSchedule,
    user::{Role, User},
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is still referenced")]
    Referenced(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    pub class: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub difficulty: String,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub quiz_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub question1_id: i64,
    pub question2_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub date: NaiveDate,
    pub question1_id: i64,
    pub question2_id: i64,
    pub q1_answer: AnswerOption,
    pub q2_answer: AnswerOption,
    pub score: i64,
    pub percentage: i64,
    pub time_taken: i64,
    pub timestamp: DateTime<Utc>,
}

impl NewAttempt {
    pub(crate) fn into_attempt(self, id: i64) -> QuizAttempt {
        QuizAttempt {
            id,
            user_id: self.user_id,
            date: self.date,
            question1_id: self.question1_id,
            question2_id: self.question2_id,
            q1_answer: self.q1_answer,
            q2_answer: self.q2_answer,
            score: self.score,
            percentage: self.percentage,
            time_taken: self.time_taken,
            timestamp: self.timestamp,
        }
    }
}

/// Outcome of the atomic attempt check-and-insert.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptInsert {
    Inserted(QuizAttempt),
    /// An attempt for the same (user, date) was already stored; nothing was written.
    Existing(QuizAttempt),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Fails with `Duplicate` if the username is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    /// Fails with `Referenced` if the user has attempts.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    async fn list_questions(&self) -> StoreResult<Vec<Question>>;
    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>>;
    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question>;
    /// Fails with `Referenced` if any schedule uses the question.
    async fn delete_question(&self, id: i64) -> StoreResult<()>;

    async fn list_schedules(&self) -> StoreResult<Vec<QuizSchedule>>;
    async fn find_schedule(&self, id: i64) -> StoreResult<Option<QuizSchedule>>;
    /// All schedules on `date`, ascending by id.
    async fn schedules_on(&self, date: NaiveDate) -> StoreResult<Vec<QuizSchedule>>;
    /// Both questions must exist and differ. A second schedule on the same
    /// date is `Duplicate` unless `allow_same_date` is set.
    async fn insert_schedule(
        &self,
        schedule: NewSchedule,
        allow_same_date: bool,
    ) -> StoreResult<QuizSchedule>;
    async fn delete_schedule(&self, id: i64) -> StoreResult<()>;

    async fn list_attempts(&self) -> StoreResult<Vec<QuizAttempt>>;
    async fn find_attempt(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<QuizAttempt>>;
    /// Attempts dated within `[start, end]`, ascending by id.
    async fn attempts_between(&self, start: NaiveDate, end: NaiveDate)
    -> StoreResult<Vec<QuizAttempt>>;
    /// Atomic check-and-insert keyed on (user_id, date).
    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptInsert>;
}
