// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::CreateQuestionRequest,
        schedule::CreateScheduleRequest,
        user::{CreateUserRequest, Role, User, UserResponse},
    },
    state::SharedStore,
    store::{NewQuestion, NewSchedule, NewUser},
    utils::html::{clean_html, clean_optional},
};

const MIN_USERNAME_LEN: usize = 3;

/// Lists all users in the system (passwords omitted).
/// Admin only.
pub async fn list_users(
    State(store): State<SharedStore>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Creates a user with the given role.
///
/// Students must carry a class; for other roles the class is dropped.
/// Admin only.
pub async fn create_user(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Usernames are stored trimmed, so the length rule applies to the trimmed value.
    let username = payload.username.trim().to_string();
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "Username must be at least {} characters.",
            MIN_USERNAME_LEN
        )));
    }

    let full_name = clean_html(&payload.full_name);
    if full_name.is_empty() {
        return Err(AppError::BadRequest("Full name is required".to_string()));
    }

    let class = match payload.role {
        Role::Student => Some(
            clean_optional(payload.class.as_deref())
                .ok_or_else(|| AppError::BadRequest("Students must have a class".to_string()))?,
        ),
        Role::Admin | Role::Faculty => None,
    };

    let user = store
        .insert_user(NewUser {
            username,
            password: payload.password,
            role: payload.role,
            full_name,
            class,
        })
        .await?;

    tracing::info!("Created {} '{}' (id {})", user.role, user.username, user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self and users with recorded attempts.
pub async fn delete_user(
    State(store): State<SharedStore>,
    Extension(admin): Extension<User>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if admin.id == id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    store.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists all questions, correct answers included.
/// Admin only.
pub async fn list_questions(
    State(store): State<SharedStore>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_questions().await?))
}

/// Adds a question to the bank. Text fields are sanitised.
/// Admin only.
pub async fn create_question(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = NewQuestion {
        question_text: clean_html(&payload.question_text),
        option_a: clean_html(&payload.option_a),
        option_b: clean_html(&payload.option_b),
        option_c: clean_html(&payload.option_c),
        option_d: clean_html(&payload.option_d),
        correct_answer: payload.correct_answer,
        difficulty: clean_html(&payload.difficulty),
    };
    if question.question_text.is_empty()
        || [
            &question.option_a,
            &question.option_b,
            &question.option_c,
            &question.option_d,
        ]
        .iter()
        .any(|o| o.is_empty())
    {
        return Err(AppError::BadRequest(
            "Question text and all four options are required".to_string(),
        ));
    }

    let question = store.insert_question(question).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// Deletes a question. Refused while a schedule still uses it.
/// Admin only.
pub async fn delete_question(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists all schedules.
/// Admin only.
pub async fn list_schedules(
    State(store): State<SharedStore>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_schedules().await?))
}

/// Schedules two questions on a date with a time window.
///
/// A second schedule on the same date is refused unless `force` is set.
/// Admin only.
pub async fn create_schedule(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.start_time > payload.end_time {
        return Err(AppError::BadRequest(
            "start_time must not be after end_time".to_string(),
        ));
    }
    if payload.question1_id == payload.question2_id {
        return Err(AppError::BadRequest(
            "A quiz needs two different questions".to_string(),
        ));
    }

    let schedule = store
        .insert_schedule(
            NewSchedule {
                quiz_date: payload.quiz_date,
                start_time: payload.start_time,
                end_time: payload.end_time,
                question1_id: payload.question1_id,
                question2_id: payload.question2_id,
            },
            payload.force,
        )
        .await?;

    if payload.force {
        tracing::warn!(
            "Schedule {} forced onto {}, which may already have a quiz",
            schedule.id,
            schedule.quiz_date
        );
    }

    Ok((StatusCode::CREATED, Json(schedule)))
}

/// Deletes a schedule.
/// Admin only.
pub async fn delete_schedule(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_schedule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
