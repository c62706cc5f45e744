// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{attempt::SubmitAttemptRequest, user::User},
    services::attempt::{AvailabilityResponse, get_availability, submit_attempt},
    state::{SharedClock, SharedStore},
};

/// Today's quiz state for the signed-in student.
///
/// Completed, unavailable (with a reason) or available with both questions.
/// Student only.
pub async fn today(
    State(store): State<SharedStore>,
    State(clock): State<SharedClock>,
    Extension(user): Extension<User>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let availability = get_availability(store.as_ref(), clock.as_ref(), &user).await?;
    Ok(Json(availability.into()))
}

/// Submits answers for today's quiz. Returns 201 and the recorded attempt.
pub async fn submit(
    State(store): State<SharedStore>,
    State(clock): State<SharedClock>,
    Extension(user): Extension<User>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = submit_attempt(store.as_ref(), clock.as_ref(), &user, payload).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}
