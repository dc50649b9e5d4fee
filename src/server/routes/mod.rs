//! API routes and handlers.

mod bulk;
mod records;
mod reports;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::records::{Student, Subject};

use super::state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Students
        .route(
            "/students",
            get(records::list::<Student>).post(records::create::<Student>),
        )
        .route(
            "/students/{id}",
            get(records::get_one::<Student>)
                .put(records::update::<Student>)
                .delete(records::remove::<Student>),
        )
        .route("/students/{id}/report", get(reports::student_report))
        // Subjects
        .route(
            "/subjects",
            get(records::list::<Subject>).post(records::create::<Subject>),
        )
        .route(
            "/subjects/{id}",
            get(records::get_one::<Subject>)
                .put(records::update::<Subject>)
                .delete(records::remove::<Subject>),
        )
        // Bulk operations
        .route("/import", post(bulk::import))
        .route("/export", get(bulk::export))
        .route("/clear-all", delete(bulk::clear_all))
        .route("/seed", post(bulk::seed))
        .route("/stats", get(reports::stats))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}
