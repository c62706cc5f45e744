// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, faculty, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, faculty_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, admin, faculty).
/// * Every route except login sits behind `auth_middleware`; each role's
///   router adds its own gate on top.
/// * Applies global middleware (Trace, CORS) and serves `STATIC_DIR`, if
///   configured, for anything outside `/api`.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(authenticated.clone()),
        );

    let quiz_routes = Router::new()
        .route("/today", get(quiz::today))
        .route("/submit", post(quiz::submit))
        .layer(middleware::from_fn(student_middleware))
        .layer(authenticated.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route("/questions/{id}", delete(admin::delete_question))
        .route(
            "/schedules",
            get(admin::list_schedules).post(admin::create_schedule),
        )
        .route("/schedules/{id}", delete(admin::delete_schedule))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(authenticated.clone());

    let faculty_routes = Router::new()
        .route("/report", get(faculty::report))
        .route("/students", get(faculty::list_students))
        .route("/attempts", get(faculty::list_attempts))
        .route("/performance", get(faculty::performance))
        .layer(middleware::from_fn(faculty_middleware))
        .layer(authenticated);

    let mut app = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/faculty", faculty_routes);

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, store::MemoryStore, utils::clock::FixedClock};

    fn app() -> Router {
        let now = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        create_router(AppState {
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(FixedClock::new(now)),
            config: Config::with_secret("secret"),
        })
    }

    async fn status(uri: &str) -> StatusCode {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn protected_routes_need_a_session() {
        for uri in [
            "/api/auth/me",
            "/api/quiz/today",
            "/api/admin/users",
            "/api/faculty/report",
        ] {
            assert_eq!(status(uri).await, StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn unknown_paths_are_404_without_static_dir() {
        assert_eq!(status("/index.html").await, StatusCode::NOT_FOUND);
    }
}
