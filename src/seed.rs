// src/seed.rs

//! Startup data: the admin account from the environment and an optional demo data set.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    config::Config,
    models::{
        question::AnswerOption::{self, A, B, C, D},
        user::Role,
    },
    services::attempt::score_answers,
    store::{AttemptInsert, NewAttempt, NewQuestion, NewSchedule, NewUser, Store, StoreResult},
};

/// (username, password, role, full name, class)
const DEMO_USERS: &[(&str, &str, Role, &str, Option<&str>)] = &[
    ("admin", "admin123", Role::Admin, "System Administrator", None),
    ("faculty1", "faculty123", Role::Faculty, "Dr. John Smith", None),
    ("student1", "student123", Role::Student, "Alice Johnson", Some("CSE-A")),
    ("student2", "student123", Role::Student, "Bob Wilson", Some("CSE-A")),
    ("student3", "student123", Role::Student, "Carol Davis", Some("CSE-B")),
    ("student4", "student123", Role::Student, "David Brown", Some("IT-A")),
    ("student5", "student123", Role::Student, "Emma Wilson", Some("IT-A")),
    ("student6", "student123", Role::Student, "Frank Miller", Some("IT-B")),
    ("student7", "student123", Role::Student, "Grace Taylor", Some("IT-B")),
    ("faculty2", "faculty123", Role::Faculty, "Prof. Sarah Johnson", None),
];

/// (text, [a, b, c, d], correct, difficulty)
const DEMO_QUESTIONS: &[(&str, [&str; 4], AnswerOption, &str)] = &[
    (
        "What is the time complexity of binary search?",
        ["O(n)", "O(log n)", "O(n²)", "O(1)"],
        B,
        "medium",
    ),
    (
        "Which data structure uses LIFO principle?",
        ["Queue", "Array", "Stack", "Linked List"],
        C,
        "easy",
    ),
    (
        "What does SQL stand for?",
        [
            "Structured Query Language",
            "Simple Query Language",
            "Standard Query Language",
            "Sequential Query Language",
        ],
        A,
        "easy",
    ),
    (
        "Which sorting algorithm has the best average case time complexity?",
        ["Bubble Sort", "Selection Sort", "Quick Sort", "Insertion Sort"],
        C,
        "medium",
    ),
    (
        "What is the space complexity of merge sort?",
        ["O(1)", "O(log n)", "O(n)", "O(n²)"],
        C,
        "medium",
    ),
    (
        "Which of the following is NOT a programming paradigm?",
        ["Object-Oriented", "Functional", "Procedural", "Algorithmic"],
        D,
        "easy",
    ),
    (
        "What does the \"Big O\" notation describe?",
        ["Memory usage", "Code readability", "Algorithm efficiency", "Program size"],
        C,
        "medium",
    ),
    (
        "In which data structure is insertion and deletion performed at the same end?",
        ["Queue", "Stack", "Array", "Tree"],
        B,
        "easy",
    ),
    (
        "What is the worst-case time complexity of quicksort?",
        ["O(n log n)", "O(n)", "O(n²)", "O(log n)"],
        C,
        "hard",
    ),
    (
        "Which sorting algorithm is stable?",
        ["Quick Sort", "Heap Sort", "Merge Sort", "Selection Sort"],
        C,
        "medium",
    ),
];

/// (username, q1 answer, q2 answer, seconds taken)
const DEMO_ATTEMPTS: &[(&str, AnswerOption, AnswerOption, i64)] =
    &[("student1", B, C, 180), ("student2", B, A, 240)];

/// Creates the admin from `ADMIN_USERNAME`/`ADMIN_PASSWORD` unless that username exists.
pub async fn seed_admin_user(store: &dyn Store, config: &Config) -> StoreResult<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(());
    };

    if store.find_user_by_username(username).await?.is_none() {
        tracing::info!("Seeding admin user: {}", username);
        store
            .insert_user(NewUser {
                username: username.clone(),
                password: password.clone(),
                role: Role::Admin,
                full_name: "System Administrator".to_string(),
                class: None,
            })
            .await?;
        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}

/// Fills an empty store with demo users, questions, a schedule for `today`
/// (09:00 to 23:59) and two sample attempts. Returns whether anything was written.
pub async fn seed_demo_data(
    store: &dyn Store,
    today: NaiveDate,
    timestamp: DateTime<Utc>,
) -> StoreResult<bool> {
    if !store.list_users().await?.is_empty() {
        tracing::info!("Store already has users, skipping demo data.");
        return Ok(false);
    }

    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for &(username, password, role, full_name, class) in DEMO_USERS {
        users.push(
            store
                .insert_user(NewUser {
                    username: username.to_string(),
                    password: password.to_string(),
                    role,
                    full_name: full_name.to_string(),
                    class: class.map(str::to_string),
                })
                .await?,
        );
    }

    let mut questions = Vec::with_capacity(DEMO_QUESTIONS.len());
    for &(text, [a, b, c, d], correct_answer, difficulty) in DEMO_QUESTIONS {
        questions.push(
            store
                .insert_question(NewQuestion {
                    question_text: text.to_string(),
                    option_a: a.to_string(),
                    option_b: b.to_string(),
                    option_c: c.to_string(),
                    option_d: d.to_string(),
                    correct_answer,
                    difficulty: difficulty.to_string(),
                })
                .await?,
        );
    }

    let (question1, question2) = (&questions[0], &questions[1]);
    let schedule = store
        .insert_schedule(
            NewSchedule {
                quiz_date: today,
                start_time: "09:00".to_string(),
                end_time: "23:59".to_string(),
                question1_id: question1.id,
                question2_id: question2.id,
            },
            true,
        )
        .await?;

    for &(username, q1_answer, q2_answer, time_taken) in DEMO_ATTEMPTS {
        let Some(user) = users.iter().find(|u| u.username == username) else {
            continue;
        };
        let (score, percentage) = score_answers(question1, question2, q1_answer, q2_answer);
        let outcome = store
            .insert_attempt(NewAttempt {
                user_id: user.id,
                date: today,
                question1_id: schedule.question1_id,
                question2_id: schedule.question2_id,
                q1_answer,
                q2_answer,
                score,
                percentage,
                time_taken,
                timestamp,
            })
            .await?;
        if let AttemptInsert::Existing(_) = outcome {
            tracing::warn!("Demo attempt for '{}' already present", username);
        }
    }

    tracing::info!(
        "Demo data seeded: {} users, {} questions, quiz {} on {}",
        users.len(),
        questions.len(),
        schedule.id,
        today
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn stamp() -> DateTime<Utc> {
        today().and_hms_opt(9, 30, 0).unwrap().and_utc()
    }

    #[tokio::test]
    async fn demo_data_is_seeded_once() {
        let store = MemoryStore::new();
        assert!(seed_demo_data(&store, today(), stamp()).await.unwrap());
        assert!(!seed_demo_data(&store, today(), stamp()).await.unwrap());

        assert_eq!(store.list_users().await.unwrap().len(), 10);
        assert_eq!(store.list_questions().await.unwrap().len(), 10);
        let schedules = store.schedules_on(today()).await.unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].start_time, "09:00");

        let attempts = store.list_attempts().await.unwrap();
        let scores: Vec<(i64, i64)> = attempts.iter().map(|a| (a.score, a.percentage)).collect();
        assert_eq!(scores, vec![(2, 100), (1, 50)]);
    }

    #[tokio::test]
    async fn admin_seed_skips_existing_username() {
        let store = MemoryStore::new();
        let mut config = Config::with_secret("secret");
        config.admin_username = Some("root".into());
        config.admin_password = Some("toor".into());

        seed_admin_user(&store, &config).await.unwrap();
        seed_admin_user(&store, &config).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}
