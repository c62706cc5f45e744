// src/services/report.rs

//! Reporting View: per-student, per-day completion table and summary stats for faculty.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, StudentPerformance},
        report::{AttemptStatus, DateRange, PerformanceReport, ReportRow, ReportStats, WeekFilter},
        user::{Role, User, UserResponse},
    },
    store::Store,
};

/// Start of the "all" range.
pub fn report_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Resolves a preset into concrete dates. Weeks run Monday to Sunday.
pub fn date_range(filter: WeekFilter, today: NaiveDate) -> DateRange {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    match filter {
        WeekFilter::Current => DateRange {
            start: monday,
            end: monday + Duration::days(6),
        },
        WeekFilter::Last => DateRange {
            start: monday - Duration::days(7),
            end: monday - Duration::days(1),
        },
        WeekFilter::All => DateRange {
            start: report_epoch(),
            end: today,
        },
    }
}

/// Builds the performance table.
///
/// One row per (student, day in range), so the row count is
/// `students x days`, not the number of attempts. Rows are grouped by student
/// in the order given, days ascending.
pub fn build_performance_report(
    users: &[User],
    attempts: &[QuizAttempt],
    class_filter: Option<&str>,
    range: DateRange,
    today: NaiveDate,
) -> PerformanceReport {
    let students: Vec<&User> = users
        .iter()
        .filter(|u| u.role == Role::Student)
        .filter(|u| class_filter.is_none_or(|c| u.class.as_deref() == Some(c)))
        .collect();
    let student_ids: HashSet<i64> = students.iter().map(|s| s.id).collect();

    let filtered: Vec<&QuizAttempt> = attempts
        .iter()
        .filter(|a| range.contains(a.date) && student_ids.contains(&a.user_id))
        .collect();

    let by_key: HashMap<(i64, NaiveDate), &QuizAttempt> =
        filtered.iter().map(|a| ((a.user_id, a.date), *a)).collect();

    let mut rows = Vec::new();
    for student in &students {
        for date in range.days() {
            let attempt = by_key.get(&(student.id, date));
            rows.push(ReportRow {
                student_id: student.id,
                full_name: student.full_name.clone(),
                class: student.class.clone(),
                date,
                status: if attempt.is_some() {
                    AttemptStatus::Completed
                } else {
                    AttemptStatus::Missed
                },
                score: attempt.map(|a| a.score),
                percentage: attempt.map(|a| a.percentage),
                time_taken: attempt.map(|a| a.time_taken),
            });
        }
    }

    let total_students = students.len() as i64;
    let completed_today = filtered.iter().filter(|a| a.date == today).count() as i64;
    let average_score = if filtered.is_empty() {
        0
    } else {
        let sum: i64 = filtered.iter().map(|a| a.percentage).sum();
        (sum as f64 / filtered.len() as f64).round() as i64
    };

    PerformanceReport {
        range,
        rows,
        stats: ReportStats {
            total_students,
            completed_today,
            missed_today: (total_students - completed_today).max(0),
            average_score,
        },
    }
}

/// Loads what the report needs from the store and builds it.
pub async fn performance_report(
    store: &dyn Store,
    class_filter: Option<&str>,
    filter: WeekFilter,
    today: NaiveDate,
) -> Result<PerformanceReport, AppError> {
    let range = date_range(filter, today);
    let users = store.list_users().await?;
    let attempts = store.attempts_between(range.start, range.end).await?;
    Ok(build_performance_report(
        &users,
        &attempts,
        class_filter,
        range,
        today,
    ))
}

/// Every student with their full attempt history, newest first.
pub async fn student_performance(store: &dyn Store) -> Result<Vec<StudentPerformance>, AppError> {
    let users = store.list_users().await?;
    let mut by_user: HashMap<i64, Vec<QuizAttempt>> = HashMap::new();
    for attempt in store.list_attempts().await? {
        by_user.entry(attempt.user_id).or_default().push(attempt);
    }

    Ok(users
        .into_iter()
        .filter(|u| u.role == Role::Student)
        .map(|student| {
            let mut attempts = by_user.remove(&student.id).unwrap_or_default();
            attempts.sort_by(|a, b| b.date.cmp(&a.date));
            StudentPerformance {
                student: UserResponse::from(student),
                attempts,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::AnswerOption;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn student(id: i64, class: &str) -> User {
        User {
            id,
            username: format!("s{}", id),
            password: "pw".into(),
            role: Role::Student,
            full_name: format!("Student {}", id),
            class: Some(class.to_string()),
        }
    }

    fn attempt(id: i64, user_id: i64, date: NaiveDate, score: i64) -> QuizAttempt {
        QuizAttempt {
            id,
            user_id,
            date,
            question1_id: 1,
            question2_id: 2,
            q1_answer: AnswerOption::A,
            q2_answer: AnswerOption::B,
            score,
            percentage: score * 50,
            time_taken: 60,
            timestamp: date.and_hms_opt(10, 0, 0).unwrap().and_utc(),
        }
    }

    #[test]
    fn week_presets_start_on_monday() {
        // 2024-05-08 is a Wednesday.
        let today = d(2024, 5, 8);
        assert_eq!(
            date_range(WeekFilter::Current, today),
            DateRange { start: d(2024, 5, 6), end: d(2024, 5, 12) }
        );
        assert_eq!(
            date_range(WeekFilter::Last, today),
            DateRange { start: d(2024, 4, 29), end: d(2024, 5, 5) }
        );
        assert_eq!(
            date_range(WeekFilter::All, today),
            DateRange { start: d(2020, 1, 1), end: today }
        );
    }

    #[test]
    fn sunday_belongs_to_the_week_before() {
        let sunday = d(2024, 5, 12);
        assert_eq!(date_range(WeekFilter::Current, sunday).start, d(2024, 5, 6));
        let monday = d(2024, 5, 13);
        assert_eq!(date_range(WeekFilter::Current, monday).start, monday);
    }

    #[test]
    fn no_attempts_gives_students_times_days_missed_rows() {
        let users = vec![student(1, "A"), student(2, "A"), student(3, "B")];
        let range = DateRange { start: d(2024, 5, 6), end: d(2024, 5, 10) };
        let report = build_performance_report(&users, &[], None, range, d(2024, 5, 8));

        assert_eq!(report.rows.len(), 3 * 5);
        assert!(report.rows.iter().all(|r| r.status == AttemptStatus::Missed && r.score.is_none()));
        assert_eq!(report.stats.average_score, 0);
        assert_eq!(report.stats.missed_today, 3);
    }

    #[test]
    fn partial_attempts_fill_one_row_per_day() {
        let users = vec![student(1, "A"), student(2, "A")];
        let range = DateRange { start: d(2024, 5, 6), end: d(2024, 5, 8) };
        let attempts = vec![attempt(1, 1, d(2024, 5, 7), 2)];
        let report = build_performance_report(&users, &attempts, None, range, d(2024, 5, 8));

        let statuses: Vec<(i64, AttemptStatus)> =
            report.rows.iter().map(|r| (r.student_id, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (1, AttemptStatus::Missed),
                (1, AttemptStatus::Completed),
                (1, AttemptStatus::Missed),
                (2, AttemptStatus::Missed),
                (2, AttemptStatus::Missed),
                (2, AttemptStatus::Missed),
            ]
        );
        assert_eq!(report.rows[1].percentage, Some(100));
        assert_eq!(report.rows[1].time_taken, Some(60));
    }

    #[test]
    fn class_filter_and_stats() {
        let mut users = vec![student(1, "A"), student(2, "A"), student(3, "B")];
        users.push(User {
            role: Role::Faculty,
            class: None,
            ..student(4, "")
        });
        let today = d(2024, 5, 8);
        let range = DateRange { start: d(2024, 5, 6), end: d(2024, 5, 8) };
        let attempts = vec![
            attempt(1, 1, today, 2),
            attempt(2, 2, today, 1),
            attempt(3, 3, today, 0),
            attempt(4, 1, d(2024, 5, 6), 1),
            // Outside the range, ignored.
            attempt(5, 2, d(2024, 5, 1), 2),
        ];

        let report = build_performance_report(&users, &attempts, Some("A"), range, today);
        assert_eq!(report.rows.len(), 2 * 3);
        assert_eq!(
            report.stats,
            ReportStats {
                total_students: 2,
                completed_today: 2,
                missed_today: 0,
                // (100 + 50 + 50) / 3 = 66.67
                average_score: 67,
            }
        );

        let all = build_performance_report(&users, &attempts, None, range, today);
        assert_eq!(all.stats.total_students, 3);
        assert_eq!(all.stats.completed_today, 3);
        // (100 + 50 + 0 + 50) / 4
        assert_eq!(all.stats.average_score, 50);
    }
}
