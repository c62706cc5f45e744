// src/store/sqlite.rs

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use super::{
    AttemptInsert, NewAttempt, NewQuestion, NewSchedule, NewUser, Store, StoreError, StoreResult,
};
use crate::models::{
    attempt::QuizAttempt, question::Question, schedule::QuizSchedule, user::User,
};

const USER_COLUMNS: &str = "id, username, password, role, full_name, class";
const QUESTION_COLUMNS: &str =
    "id, question_text, option_a, option_b, option_c, option_d, correct_answer, difficulty";
const SCHEDULE_COLUMNS: &str =
    "id, quiz_date, start_time, end_time, question1_id, question2_id";
const ATTEMPT_COLUMNS: &str = "id, user_id, quiz_date, question1_id, question2_id, q1_answer, \
     q2_answer, score, percentage, time_taken, timestamp";

/// Relational store on SQLite.
///
/// `AUTOINCREMENT` keeps ids strictly increasing across deletes; the
/// `UNIQUE (user_id, quiz_date)` constraint backs the attempt upsert.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects (creating the file if needed) and runs the embedded migrations.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = pool_options(url).connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("SQLite store ready at {}", url);

        Ok(Self { pool })
    }
}

/// Every `:memory:` connection is its own database, so such a pool holds exactly
/// one connection and never recycles it.
fn pool_options(url: &str) -> SqlitePoolOptions {
    if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

fn map_constraint(
    err: sqlx::Error,
    duplicate: impl FnOnce() -> String,
    missing: impl FnOnce() -> String,
) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(duplicate());
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(missing());
        }
    }
    err.into()
}

fn corrupt(what: &str, detail: String) -> StoreError {
    StoreError::Storage(format!("corrupt {} row: {}", what, detail))
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
    full_name: String,
    class: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            role: row.role.parse().map_err(|e| corrupt("user", e))?,
            full_name: row.full_name,
            class: row.class,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    difficulty: String,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: row.id,
            question_text: row.question_text,
            option_a: row.option_a,
            option_b: row.option_b,
            option_c: row.option_c,
            option_d: row.option_d,
            correct_answer: row
                .correct_answer
                .parse()
                .map_err(|e| corrupt("question", e))?,
            difficulty: row.difficulty,
        })
    }
}

#[derive(FromRow)]
struct ScheduleRow {
    id: i64,
    quiz_date: NaiveDate,
    start_time: String,
    end_time: String,
    question1_id: i64,
    question2_id: i64,
}

impl From<ScheduleRow> for QuizSchedule {
    fn from(row: ScheduleRow) -> Self {
        QuizSchedule {
            id: row.id,
            quiz_date: row.quiz_date,
            start_time: row.start_time,
            end_time: row.end_time,
            question1_id: row.question1_id,
            question2_id: row.question2_id,
        }
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    user_id: i64,
    quiz_date: NaiveDate,
    question1_id: i64,
    question2_id: i64,
    q1_answer: String,
    q2_answer: String,
    score: i64,
    percentage: i64,
    time_taken: i64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(QuizAttempt {
            id: row.id,
            user_id: row.user_id,
            date: row.quiz_date,
            question1_id: row.question1_id,
            question2_id: row.question2_id,
            q1_answer: row.q1_answer.parse().map_err(|e| corrupt("attempt", e))?,
            q2_answer: row.q2_answer.parse().map_err(|e| corrupt("attempt", e))?,
            score: row.score,
            percentage: row.percentage,
            time_taken: row.time_taken,
            timestamp: row.timestamp,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password, role, full_name, class) \
             VALUES (?, ?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(&user.full_name)
        .bind(&user.class)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || format!("username '{}'", user.username),
                || "user".to_string(),
            )
        })?;
        User::try_from(row)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM users WHERE id = ? \
             AND NOT EXISTS (SELECT 1 FROM quiz_attempts WHERE user_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_user(id).await? {
                Some(_) => Err(StoreError::Referenced(format!("user {}", id))),
                None => Err(StoreError::NotFound(format!("user {}", id))),
            };
        }
        Ok(())
    }

    async fn list_questions(&self) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions ORDER BY id",
            QUESTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = ?",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Question::try_from)
        .transpose()
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "INSERT INTO questions \
             (question_text, option_a, option_b, option_c, option_d, correct_answer, difficulty) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            QUESTION_COLUMNS
        ))
        .bind(&question.question_text)
        .bind(&question.option_a)
        .bind(&question.option_b)
        .bind(&question.option_c)
        .bind(&question.option_d)
        .bind(question.correct_answer.as_str())
        .bind(&question.difficulty)
        .fetch_one(&self.pool)
        .await?;
        Question::try_from(row)
    }

    async fn delete_question(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM questions WHERE id = ? AND NOT EXISTS \
             (SELECT 1 FROM quiz_schedules WHERE question1_id = ? OR question2_id = ?)",
        )
        .bind(id)
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_question(id).await? {
                Some(_) => Err(StoreError::Referenced(format!("question {}", id))),
                None => Err(StoreError::NotFound(format!("question {}", id))),
            };
        }
        Ok(())
    }

    async fn list_schedules(&self) -> StoreResult<Vec<QuizSchedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM quiz_schedules ORDER BY id",
            SCHEDULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(QuizSchedule::from).collect())
    }

    async fn find_schedule(&self, id: i64) -> StoreResult<Option<QuizSchedule>> {
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM quiz_schedules WHERE id = ?",
            SCHEDULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(QuizSchedule::from))
    }

    async fn schedules_on(&self, date: NaiveDate) -> StoreResult<Vec<QuizSchedule>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
            "SELECT {} FROM quiz_schedules WHERE quiz_date = ? ORDER BY id",
            SCHEDULE_COLUMNS
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(QuizSchedule::from).collect())
    }

    async fn insert_schedule(
        &self,
        schedule: NewSchedule,
        allow_same_date: bool,
    ) -> StoreResult<QuizSchedule> {
        if schedule.question1_id == schedule.question2_id {
            return Err(StoreError::Duplicate(format!(
                "question {} in the same schedule",
                schedule.question1_id
            )));
        }
        for qid in [schedule.question1_id, schedule.question2_id] {
            if self.find_question(qid).await?.is_none() {
                return Err(StoreError::NotFound(format!("question {}", qid)));
            }
        }

        // Single statement: the same-date check and the insert cannot interleave.
        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "INSERT INTO quiz_schedules \
             (quiz_date, start_time, end_time, question1_id, question2_id) \
             SELECT ?, ?, ?, ?, ? \
             WHERE ? OR NOT EXISTS (SELECT 1 FROM quiz_schedules WHERE quiz_date = ?) \
             RETURNING {}",
            SCHEDULE_COLUMNS
        ))
        .bind(schedule.quiz_date)
        .bind(&schedule.start_time)
        .bind(&schedule.end_time)
        .bind(schedule.question1_id)
        .bind(schedule.question2_id)
        .bind(allow_same_date)
        .bind(schedule.quiz_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || format!("quiz schedule for {}", schedule.quiz_date),
                || "question".to_string(),
            )
        })?;

        row.map(QuizSchedule::from).ok_or_else(|| {
            StoreError::Duplicate(format!("quiz schedule for {}", schedule.quiz_date))
        })
    }

    async fn delete_schedule(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM quiz_schedules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("quiz schedule {}", id)));
        }
        Ok(())
    }

    async fn list_attempts(&self) -> StoreResult<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts ORDER BY id",
            ATTEMPT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_attempt(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<QuizAttempt>> {
        sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE user_id = ? AND quiz_date = ?",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .map(QuizAttempt::try_from)
        .transpose()
    }

    async fn attempts_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE quiz_date BETWEEN ? AND ? ORDER BY id",
            ATTEMPT_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptInsert> {
        let (user_id, date) = (attempt.user_id, attempt.date);

        let inserted = sqlx::query_as::<_, AttemptRow>(&format!(
            "INSERT INTO quiz_attempts \
             (user_id, quiz_date, question1_id, question2_id, q1_answer, q2_answer, \
              score, percentage, time_taken, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, quiz_date) DO NOTHING \
             RETURNING {}",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt.user_id)
        .bind(attempt.date)
        .bind(attempt.question1_id)
        .bind(attempt.question2_id)
        .bind(attempt.q1_answer.as_str())
        .bind(attempt.q2_answer.as_str())
        .bind(attempt.score)
        .bind(attempt.percentage)
        .bind(attempt.time_taken)
        .bind(attempt.timestamp)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            map_constraint(
                e,
                || format!("attempt for user {} on {}", user_id, date),
                || format!("user {}", user_id),
            )
        })?;

        match inserted {
            Some(row) => Ok(AttemptInsert::Inserted(QuizAttempt::try_from(row)?)),
            None => self
                .find_attempt(user_id, date)
                .await?
                .map(AttemptInsert::Existing)
                .ok_or_else(|| {
                    StoreError::Storage(format!(
                        "attempt for user {} on {} vanished after conflict",
                        user_id, date
                    ))
                }),
        }
    }
}
