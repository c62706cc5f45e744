// src/services/attempt.rs

//! Attempt Engine: availability of today's quiz for a user, scoring, and
//! the one-attempt-per-day rule.

use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, SubmitAttemptRequest},
        question::{AnswerOption, PublicQuestion, Question},
        schedule::QuizSchedule,
        user::User,
    },
    services::scheduler::{is_within_window, resolve_today_quiz, window_message},
    store::{AttemptInsert, NewAttempt, Store},
    utils::{clock::Clock, time::format_hh_mm},
};

pub const NO_QUIZ_TODAY: &str = "No quiz scheduled for today";
const QUESTIONS_MISSING: &str = "Quiz questions are not available";

/// Today's quiz with both questions resolved.
#[derive(Debug, Clone)]
pub struct QuizPaper {
    pub schedule: QuizSchedule,
    pub question1: Question,
    pub question2: Question,
}

#[derive(Debug, Clone)]
pub enum Availability {
    Completed(QuizAttempt),
    Unavailable(String),
    Available(QuizPaper),
}

/// Availability as sent to a student. Correct answers are never included.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityResponse {
    Completed {
        attempt: QuizAttempt,
    },
    Unavailable {
        reason: String,
    },
    Available {
        schedule: QuizSchedule,
        questions: Vec<PublicQuestion>,
    },
}

impl From<Availability> for AvailabilityResponse {
    fn from(availability: Availability) -> Self {
        match availability {
            Availability::Completed(attempt) => AvailabilityResponse::Completed { attempt },
            Availability::Unavailable(reason) => AvailabilityResponse::Unavailable { reason },
            Availability::Available(paper) => AvailabilityResponse::Available {
                schedule: paper.schedule,
                questions: vec![paper.question1.into(), paper.question2.into()],
            },
        }
    }
}

/// Computes the quiz state for `user` at the clock's current instant.
///
/// Order matters: a finished attempt is reported even after the window closed.
pub async fn get_availability(
    store: &dyn Store,
    clock: &dyn Clock,
    user: &User,
) -> Result<Availability, AppError> {
    let now = clock.now();
    let today = now.date();

    if let Some(attempt) = store.find_attempt(user.id, today).await? {
        return Ok(Availability::Completed(attempt));
    }

    let Some(schedule) = resolve_today_quiz(store, today).await? else {
        return Ok(Availability::Unavailable(NO_QUIZ_TODAY.to_string()));
    };

    if !is_within_window(&schedule, &format_hh_mm(now.time())) {
        return Ok(Availability::Unavailable(window_message(&schedule)));
    }

    match load_questions(store, &schedule).await? {
        Some((question1, question2)) => Ok(Availability::Available(QuizPaper {
            schedule,
            question1,
            question2,
        })),
        None => Ok(Availability::Unavailable(QUESTIONS_MISSING.to_string())),
    }
}

/// One point per correct answer. Returns `(score, percentage)`.
pub fn score_answers(
    question1: &Question,
    question2: &Question,
    q1_answer: AnswerOption,
    q2_answer: AnswerOption,
) -> (i64, i64) {
    let score = i64::from(q1_answer == question1.correct_answer)
        + i64::from(q2_answer == question2.correct_answer);
    (score, score * 50)
}

/// Scores and records today's attempt for `user`.
///
/// A second submission for the same day never writes anything; it fails with
/// `AlreadyAttempted` carrying the stored attempt, also when two submissions
/// race each other.
pub async fn submit_attempt(
    store: &dyn Store,
    clock: &dyn Clock,
    user: &User,
    req: SubmitAttemptRequest,
) -> Result<QuizAttempt, AppError> {
    let schedule = store
        .find_schedule(req.quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let now = clock.now();
    let today = now.date();

    let todays = resolve_today_quiz(store, today)
        .await?
        .ok_or_else(|| AppError::NotScheduled(NO_QUIZ_TODAY.to_string()))?;
    if todays.id != schedule.id {
        return Err(AppError::NotScheduled(format!(
            "Quiz {} is not today's quiz",
            schedule.id
        )));
    }

    if let Some(stray) = req
        .answers
        .keys()
        .find(|id| **id != schedule.question1_id && **id != schedule.question2_id)
    {
        return Err(AppError::BadRequest(format!(
            "Question {} is not part of this quiz",
            stray
        )));
    }
    let (Some(&q1_answer), Some(&q2_answer)) = (
        req.answers.get(&schedule.question1_id),
        req.answers.get(&schedule.question2_id),
    ) else {
        return Err(AppError::BadRequest(
            "Please answer both questions before submitting".to_string(),
        ));
    };

    if let Some(existing) = store.find_attempt(user.id, today).await? {
        tracing::warn!("User {} resubmitted quiz for {}", user.id, today);
        return Err(AppError::AlreadyAttempted(Box::new(existing)));
    }

    if !is_within_window(&schedule, &format_hh_mm(now.time())) {
        return Err(AppError::OutOfWindow(window_message(&schedule)));
    }

    let (question1, question2) = load_questions(store, &schedule)
        .await?
        .ok_or_else(|| AppError::NotFound(QUESTIONS_MISSING.to_string()))?;

    let (score, percentage) = score_answers(&question1, &question2, q1_answer, q2_answer);

    let attempt = NewAttempt {
        user_id: user.id,
        date: today,
        question1_id: question1.id,
        question2_id: question2.id,
        q1_answer,
        q2_answer,
        score,
        percentage,
        time_taken: req.time_taken.max(0),
        timestamp: clock.utc_now(),
    };

    match store.insert_attempt(attempt).await? {
        AttemptInsert::Inserted(attempt) => {
            tracing::info!(
                "Recorded attempt {} for user {} on {}: {}/2",
                attempt.id,
                user.id,
                today,
                attempt.score
            );
            Ok(attempt)
        }
        AttemptInsert::Existing(existing) => {
            tracing::warn!("Concurrent submission for user {} on {} rejected", user.id, today);
            Err(AppError::AlreadyAttempted(Box::new(existing)))
        }
    }
}

async fn load_questions(
    store: &dyn Store,
    schedule: &QuizSchedule,
) -> Result<Option<(Question, Question)>, AppError> {
    let question1 = store.find_question(schedule.question1_id).await?;
    let question2 = store.find_question(schedule.question2_id).await?;
    Ok(question1.zip(question2))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::{
        models::user::Role,
        store::{MemoryStore, NewQuestion, NewSchedule, NewUser},
        utils::clock::FixedClock,
    };

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: FixedClock,
        student: User,
        schedule: QuizSchedule,
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    async fn add_student(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                username: name.to_string(),
                password: "student123".into(),
                role: Role::Student,
                full_name: name.to_string(),
                class: Some("CSE-A".into()),
            })
            .await
            .unwrap()
    }

    async fn add_question(store: &MemoryStore, correct: AnswerOption) -> Question {
        store
            .insert_question(NewQuestion {
                question_text: "Pick one".into(),
                option_a: "a".into(),
                option_b: "b".into(),
                option_c: "c".into(),
                option_d: "d".into(),
                correct_answer: correct,
                difficulty: "easy".into(),
            })
            .await
            .unwrap()
    }

    /// 09:00-17:00 quiz; question 1 answer B, question 2 answer C.
    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let student = add_student(&store, "alice").await;
        let q1 = add_question(&store, AnswerOption::B).await;
        let q2 = add_question(&store, AnswerOption::C).await;
        let schedule = store
            .insert_schedule(
                NewSchedule {
                    quiz_date: date(),
                    start_time: "09:00".into(),
                    end_time: "17:00".into(),
                    question1_id: q1.id,
                    question2_id: q2.id,
                },
                false,
            )
            .await
            .unwrap();
        Fixture {
            store,
            clock: FixedClock::new(at(10, 0)),
            student,
            schedule,
        }
    }

    fn submission(schedule: &QuizSchedule, a1: AnswerOption, a2: AnswerOption) -> SubmitAttemptRequest {
        SubmitAttemptRequest {
            quiz_id: schedule.id,
            answers: HashMap::from([(schedule.question1_id, a1), (schedule.question2_id, a2)]),
            time_taken: 95,
        }
    }

    #[tokio::test]
    async fn scenario_full_marks_then_resubmission_rejected() {
        let f = fixture().await;

        let attempt = submit_attempt(
            f.store.as_ref(),
            &f.clock,
            &f.student,
            submission(&f.schedule, AnswerOption::B, AnswerOption::C),
        )
        .await
        .unwrap();
        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.percentage, 100);
        assert_eq!(attempt.time_taken, 95);
        assert_eq!(attempt.date, date());
        assert_eq!(attempt.timestamp, at(10, 0).and_utc());

        f.clock.set(at(11, 0));
        let err = submit_attempt(
            f.store.as_ref(),
            &f.clock,
            &f.student,
            submission(&f.schedule, AnswerOption::A, AnswerOption::A),
        )
        .await
        .unwrap_err();
        match err {
            AppError::AlreadyAttempted(existing) => assert_eq!(*existing, attempt),
            other => panic!("expected AlreadyAttempted, got {:?}", other),
        }
        assert_eq!(f.store.list_attempts().await.unwrap(), vec![attempt]);
    }

    #[test]
    fn score_counts_correct_answers() {
        let q = |correct| Question {
            id: 1,
            question_text: String::new(),
            option_a: String::new(),
            option_b: String::new(),
            option_c: String::new(),
            option_d: String::new(),
            correct_answer: correct,
            difficulty: String::new(),
        };
        let (q1, q2) = (q(AnswerOption::B), q(AnswerOption::C));
        let options = [AnswerOption::A, AnswerOption::B, AnswerOption::C, AnswerOption::D];
        for a1 in options {
            for a2 in options {
                let expected = i64::from(a1 == AnswerOption::B) + i64::from(a2 == AnswerOption::C);
                assert_eq!(score_answers(&q1, &q2, a1, a2), (expected, expected * 50));
            }
        }
    }

    #[tokio::test]
    async fn availability_follows_the_window() {
        let f = fixture().await;

        async fn check(f: &Fixture, h: u32, m: u32) -> Result<Availability, AppError> {
            f.clock.set(at(h, m));
            get_availability(f.store.as_ref(), &f.clock, &f.student).await
        }

        match check(&f, 8, 59).await.unwrap() {
            Availability::Unavailable(reason) => {
                assert_eq!(reason, "Quiz is available from 09:00 to 17:00")
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        assert!(matches!(check(&f, 9, 0).await.unwrap(), Availability::Available(_)));
        assert!(matches!(check(&f, 17, 0).await.unwrap(), Availability::Available(_)));
        assert!(matches!(check(&f, 17, 1).await.unwrap(), Availability::Unavailable(_)));
    }

    #[tokio::test]
    async fn availability_with_no_schedule() {
        let f = fixture().await;
        f.clock.set(at(10, 0) + chrono::Duration::days(1));
        match get_availability(f.store.as_ref(), &f.clock, &f.student).await.unwrap() {
            Availability::Unavailable(reason) => assert_eq!(reason, NO_QUIZ_TODAY),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn completed_attempt_wins_over_closed_window() {
        let f = fixture().await;
        let attempt = submit_attempt(
            f.store.as_ref(),
            &f.clock,
            &f.student,
            submission(&f.schedule, AnswerOption::B, AnswerOption::A),
        )
        .await
        .unwrap();
        assert_eq!((attempt.score, attempt.percentage), (1, 50));

        f.clock.set(at(20, 0));
        match get_availability(f.store.as_ref(), &f.clock, &f.student).await.unwrap() {
            Availability::Completed(found) => assert_eq!(found, attempt),
            other => panic!("expected Completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn available_response_hides_answers() {
        let f = fixture().await;
        let availability = get_availability(f.store.as_ref(), &f.clock, &f.student)
            .await
            .unwrap();
        let json = serde_json::to_value(AvailabilityResponse::from(availability)).unwrap();
        assert_eq!(json["status"], "available");
        assert_eq!(json["questions"].as_array().unwrap().len(), 2);
        assert!(json["questions"][0].get("correct_answer").is_none());
    }

    #[tokio::test]
    async fn rejects_foreign_and_missing_answers() {
        let f = fixture().await;

        let mut stray = submission(&f.schedule, AnswerOption::B, AnswerOption::C);
        stray.answers.insert(999, AnswerOption::A);
        assert!(matches!(
            submit_attempt(f.store.as_ref(), &f.clock, &f.student, stray).await,
            Err(AppError::BadRequest(_))
        ));

        let mut partial = submission(&f.schedule, AnswerOption::B, AnswerOption::C);
        partial.answers.remove(&f.schedule.question2_id);
        assert!(matches!(
            submit_attempt(f.store.as_ref(), &f.clock, &f.student, partial).await,
            Err(AppError::BadRequest(_))
        ));

        assert!(f.store.list_attempts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_quiz_other_days_and_closed_window() {
        let f = fixture().await;

        let mut unknown = submission(&f.schedule, AnswerOption::B, AnswerOption::C);
        unknown.quiz_id = 404;
        assert!(matches!(
            submit_attempt(f.store.as_ref(), &f.clock, &f.student, unknown).await,
            Err(AppError::NotFound(_))
        ));

        f.clock.set(at(10, 0) - chrono::Duration::days(1));
        assert!(matches!(
            submit_attempt(
                f.store.as_ref(),
                &f.clock,
                &f.student,
                submission(&f.schedule, AnswerOption::B, AnswerOption::C)
            )
            .await,
            Err(AppError::NotScheduled(_))
        ));

        f.clock.set(at(17, 1));
        assert!(matches!(
            submit_attempt(
                f.store.as_ref(),
                &f.clock,
                &f.student,
                submission(&f.schedule, AnswerOption::B, AnswerOption::C)
            )
            .await,
            Err(AppError::OutOfWindow(_))
        ));
    }

    #[tokio::test]
    async fn negative_time_is_clamped() {
        let f = fixture().await;
        let mut req = submission(&f.schedule, AnswerOption::B, AnswerOption::C);
        req.time_taken = -30;
        let attempt = submit_attempt(f.store.as_ref(), &f.clock, &f.student, req)
            .await
            .unwrap();
        assert_eq!(attempt.time_taken, 0);
    }

    #[tokio::test]
    async fn racing_submissions_store_exactly_one_attempt() {
        let f = fixture().await;
        let clock = Arc::new(f.clock);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = f.store.clone();
            let clock = clock.clone();
            let student = f.student.clone();
            let req = submission(&f.schedule, AnswerOption::B, AnswerOption::C);
            handles.push(tokio::spawn(async move {
                submit_attempt(store.as_ref(), clock.as_ref(), &student, req).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::AlreadyAttempted(_)) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(f.store.list_attempts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_students_get_unique_increasing_ids() {
        let f = fixture().await;
        let clock = Arc::new(f.clock);
        let mut students = Vec::new();
        for i in 0..8 {
            students.push(add_student(&f.store, &format!("student{}", i)).await);
        }

        let mut handles = Vec::new();
        for student in students {
            let store = f.store.clone();
            let clock = clock.clone();
            let req = submission(&f.schedule, AnswerOption::B, AnswerOption::D);
            handles.push(tokio::spawn(async move {
                submit_attempt(store.as_ref(), clock.as_ref(), &student, req).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let ids: Vec<i64> = f.store.list_attempts().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 8);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
