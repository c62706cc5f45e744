// src/store/memory.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{
    AttemptInsert, NewAttempt, NewQuestion, NewSchedule, NewUser, Store, StoreError, StoreResult,
};
use crate::models::{
    attempt::QuizAttempt, question::Question, schedule::QuizSchedule, user::User,
};

/// Last id handed out per record kind. Ids are never reused, even after deletes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastIds {
    user: i64,
    question: i64,
    schedule: i64,
    attempt: i64,
}

/// The whole data set. Also the on-disk JSON layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default)]
    schedules: Vec<QuizSchedule>,
    #[serde(default)]
    attempts: Vec<QuizAttempt>,
    #[serde(default)]
    last_ids: LastIds,
}

impl Database {
    /// Snapshots written by hand may lack `last_ids`; never hand out an id below an existing one.
    fn reconcile_ids(&mut self) {
        let ids = &mut self.last_ids;
        ids.user = ids.user.max(max_id(self.users.iter().map(|r| r.id)));
        ids.question = ids.question.max(max_id(self.questions.iter().map(|r| r.id)));
        ids.schedule = ids.schedule.max(max_id(self.schedules.iter().map(|r| r.id)));
        ids.attempt = ids.attempt.max(max_id(self.attempts.iter().map(|r| r.id)));
    }
}

fn max_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0)
}

/// In-process store. Every write goes through one lock, so the attempt
/// check-and-insert is atomic. With a snapshot path, each write is persisted
/// (temp file + rename) before it becomes visible; a failed write leaves the
/// previous state untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    db: RwLock<Database>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Purely in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a JSON snapshot file. Missing file means an empty store.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut db = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Database>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Database::default(),
            Err(e) => return Err(e.into()),
        };
        db.reconcile_ids();

        tracing::info!(
            "Loaded data file {:?}: {} users, {} questions, {} schedules, {} attempts",
            path,
            db.users.len(),
            db.questions.len(),
            db.schedules.len(),
            db.attempts.len()
        );

        Ok(Self {
            db: RwLock::new(db),
            path: Some(path),
        })
    }

    async fn persist(&self, db: &Database) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(db)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Applies `f` to a copy of the data, persists it, then publishes it.
    async fn commit<T>(
        &self,
        f: impl FnOnce(&mut Database) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.db.write().await;
        self.commit_locked(&mut guard, f).await
    }

    /// Same as [`commit`](Self::commit) for a caller already holding the write lock.
    async fn commit_locked<T>(
        &self,
        current: &mut Database,
        f: impl FnOnce(&mut Database) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut next = current.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *current = next;
        Ok(out)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.db.read().await.users.clone())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.db.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .db
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.commit(|db| {
            if db.users.iter().any(|u| u.username == user.username) {
                return Err(StoreError::Duplicate(format!("username '{}'", user.username)));
            }
            db.last_ids.user += 1;
            let user = User {
                id: db.last_ids.user,
                username: user.username,
                password: user.password,
                role: user.role,
                full_name: user.full_name,
                class: user.class,
            };
            db.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        self.commit(|db| {
            if !db.users.iter().any(|u| u.id == id) {
                return Err(StoreError::NotFound(format!("user {}", id)));
            }
            if db.attempts.iter().any(|a| a.user_id == id) {
                return Err(StoreError::Referenced(format!("user {}", id)));
            }
            db.users.retain(|u| u.id != id);
            Ok(())
        })
        .await
    }

    async fn list_questions(&self) -> StoreResult<Vec<Question>> {
        Ok(self.db.read().await.questions.clone())
    }

    async fn find_question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self
            .db
            .read()
            .await
            .questions
            .iter()
            .find(|q| q.id == id)
            .cloned())
    }

    async fn insert_question(&self, question: NewQuestion) -> StoreResult<Question> {
        self.commit(|db| {
            db.last_ids.question += 1;
            let question = Question {
                id: db.last_ids.question,
                question_text: question.question_text,
                option_a: question.option_a,
                option_b: question.option_b,
                option_c: question.option_c,
                option_d: question.option_d,
                correct_answer: question.correct_answer,
                difficulty: question.difficulty,
            };
            db.questions.push(question.clone());
            Ok(question)
        })
        .await
    }

    async fn delete_question(&self, id: i64) -> StoreResult<()> {
        self.commit(|db| {
            if !db.questions.iter().any(|q| q.id == id) {
                return Err(StoreError::NotFound(format!("question {}", id)));
            }
            if db
                .schedules
                .iter()
                .any(|s| s.question1_id == id || s.question2_id == id)
            {
                return Err(StoreError::Referenced(format!("question {}", id)));
            }
            db.questions.retain(|q| q.id != id);
            Ok(())
        })
        .await
    }

    async fn list_schedules(&self) -> StoreResult<Vec<QuizSchedule>> {
        Ok(self.db.read().await.schedules.clone())
    }

    async fn find_schedule(&self, id: i64) -> StoreResult<Option<QuizSchedule>> {
        Ok(self
            .db
            .read()
            .await
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn schedules_on(&self, date: NaiveDate) -> StoreResult<Vec<QuizSchedule>> {
        let mut found: Vec<QuizSchedule> = self
            .db
            .read()
            .await
            .schedules
            .iter()
            .filter(|s| s.quiz_date == date)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);
        Ok(found)
    }

    async fn insert_schedule(
        &self,
        schedule: NewSchedule,
        allow_same_date: bool,
    ) -> StoreResult<QuizSchedule> {
        self.commit(|db| {
            if schedule.question1_id == schedule.question2_id {
                return Err(StoreError::Duplicate(format!(
                    "question {} in the same schedule",
                    schedule.question1_id
                )));
            }
            for qid in [schedule.question1_id, schedule.question2_id] {
                if !db.questions.iter().any(|q| q.id == qid) {
                    return Err(StoreError::NotFound(format!("question {}", qid)));
                }
            }
            if !allow_same_date && db.schedules.iter().any(|s| s.quiz_date == schedule.quiz_date) {
                return Err(StoreError::Duplicate(format!(
                    "quiz schedule for {}",
                    schedule.quiz_date
                )));
            }
            db.last_ids.schedule += 1;
            let schedule = QuizSchedule {
                id: db.last_ids.schedule,
                quiz_date: schedule.quiz_date,
                start_time: schedule.start_time,
                end_time: schedule.end_time,
                question1_id: schedule.question1_id,
                question2_id: schedule.question2_id,
            };
            db.schedules.push(schedule.clone());
            Ok(schedule)
        })
        .await
    }

    async fn delete_schedule(&self, id: i64) -> StoreResult<()> {
        self.commit(|db| {
            let before = db.schedules.len();
            db.schedules.retain(|s| s.id != id);
            if db.schedules.len() == before {
                return Err(StoreError::NotFound(format!("quiz schedule {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn list_attempts(&self) -> StoreResult<Vec<QuizAttempt>> {
        Ok(self.db.read().await.attempts.clone())
    }

    async fn find_attempt(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<QuizAttempt>> {
        Ok(self
            .db
            .read()
            .await
            .attempts
            .iter()
            .find(|a| a.user_id == user_id && a.date == date)
            .cloned())
    }

    async fn attempts_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<QuizAttempt>> {
        Ok(self
            .db
            .read()
            .await
            .attempts
            .iter()
            .filter(|a| start <= a.date && a.date <= end)
            .cloned()
            .collect())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> StoreResult<AttemptInsert> {
        let mut guard = self.db.write().await;

        // A duplicate changes nothing, so it never touches the snapshot file.
        if let Some(existing) = guard
            .attempts
            .iter()
            .find(|a| a.user_id == attempt.user_id && a.date == attempt.date)
        {
            return Ok(AttemptInsert::Existing(existing.clone()));
        }

        self.commit_locked(&mut guard, |db| {
            if !db.users.iter().any(|u| u.id == attempt.user_id) {
                return Err(StoreError::NotFound(format!("user {}", attempt.user_id)));
            }
            db.last_ids.attempt += 1;
            let attempt = attempt.into_attempt(db.last_ids.attempt);
            db.attempts.push(attempt.clone());
            Ok(AttemptInsert::Inserted(attempt))
        })
        .await
    }
}
