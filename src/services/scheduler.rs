// src/services/scheduler.rs

//! Quiz Scheduler: which quiz runs on a given day, and whether its window is open.

use chrono::NaiveDate;

use crate::{
    models::schedule::QuizSchedule,
    store::{Store, StoreResult},
};

/// Resolves the quiz scheduled for `today`.
///
/// Same-date schedules can exist when an admin forced one through; the
/// lowest id (the one scheduled first) wins.
pub async fn resolve_today_quiz(
    store: &dyn Store,
    today: NaiveDate,
) -> StoreResult<Option<QuizSchedule>> {
    let schedules = store.schedules_on(today).await?;
    Ok(schedules.into_iter().min_by_key(|s| s.id))
}

/// `start_time <= now <= end_time`, all zero-padded "HH:MM".
pub fn is_within_window(schedule: &QuizSchedule, now: &str) -> bool {
    schedule.start_time.as_str() <= now && now <= schedule.end_time.as_str()
}

/// Message shown when the window is closed.
pub fn window_message(schedule: &QuizSchedule) -> String {
    format!(
        "Quiz is available from {} to {}",
        schedule.start_time, schedule.end_time
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::question::AnswerOption,
        store::{MemoryStore, NewQuestion, NewSchedule},
    };

    fn schedule(start: &str, end: &str) -> QuizSchedule {
        QuizSchedule {
            id: 1,
            quiz_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            question1_id: 1,
            question2_id: 2,
        }
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let s = schedule("09:00", "17:00");
        assert!(!is_within_window(&s, "08:59"));
        assert!(is_within_window(&s, "09:00"));
        assert!(is_within_window(&s, "12:30"));
        assert!(is_within_window(&s, "17:00"));
        assert!(!is_within_window(&s, "17:01"));
    }

    #[test]
    fn window_message_names_both_bounds() {
        assert_eq!(
            window_message(&schedule("09:00", "17:00")),
            "Quiz is available from 09:00 to 17:00"
        );
    }

    #[tokio::test]
    async fn lowest_id_wins_on_duplicate_dates() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let q = store
                .insert_question(NewQuestion {
                    question_text: "q".into(),
                    option_a: "a".into(),
                    option_b: "b".into(),
                    option_c: "c".into(),
                    option_d: "d".into(),
                    correct_answer: AnswerOption::A,
                    difficulty: "easy".into(),
                })
                .await
                .unwrap();
            ids.push(q.id);
        }
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let first = store
            .insert_schedule(
                NewSchedule {
                    quiz_date: date,
                    start_time: "09:00".into(),
                    end_time: "10:00".into(),
                    question1_id: ids[0],
                    question2_id: ids[1],
                },
                false,
            )
            .await
            .unwrap();
        store
            .insert_schedule(
                NewSchedule {
                    quiz_date: date,
                    start_time: "08:00".into(),
                    end_time: "18:00".into(),
                    question1_id: ids[1],
                    question2_id: ids[2],
                },
                true,
            )
            .await
            .unwrap();

        let resolved = resolve_today_quiz(&store, date).await.unwrap().unwrap();
        assert_eq!(resolved, first);

        let other_day = date.succ_opt().unwrap();
        assert!(resolve_today_quiz(&store, other_day).await.unwrap().is_none());
    }
}
