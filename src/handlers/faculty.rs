// src/handlers/faculty.rs

use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    error::AppError,
    models::{
        attempt::{QuizAttempt, StudentPerformance},
        report::{PerformanceReport, ReportQuery},
        user::{Role, UserResponse},
    },
    services::report::{performance_report, student_performance},
    state::{SharedClock, SharedStore},
};

/// Per-student, per-day completion table for the selected week.
///
/// `?class=` narrows to one class (empty means all); `?week=` is
/// `current` (default), `last` or `all`.
/// Faculty only.
pub async fn report(
    State(store): State<SharedStore>,
    State(clock): State<SharedClock>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PerformanceReport>, AppError> {
    let class = query.class.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let report = performance_report(store.as_ref(), class, query.week, clock.today()).await?;
    Ok(Json(report))
}

/// Lists every student.
pub async fn list_students(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let students = store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.role == Role::Student)
        .map(UserResponse::from)
        .collect();
    Ok(Json(students))
}

pub async fn list_attempts(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<QuizAttempt>>, AppError> {
    Ok(Json(store.list_attempts().await?))
}

/// Each student with their attempt history, newest first.
pub async fn performance(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<StudentPerformance>>, AppError> {
    Ok(Json(student_performance(store.as_ref()).await?))
}
