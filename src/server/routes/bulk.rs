//! Import, export, clear and seed handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::kv::{Document, ImportReport};
use crate::records::{seed_entries, Collection, Dataset};

use super::super::{error::ApiError, response::ApiResponse, state::AppState};

/// Rows written per collection.
#[derive(Debug, Serialize)]
pub struct CollectionCounts {
    pub students: usize,
    pub subjects: usize,
}

/// Every collection's documents.
#[derive(Debug, Serialize)]
pub struct Export {
    pub students: Vec<Document>,
    pub subjects: Vec<Document>,
}

/// Import students and subjects.
///
/// Every row is validated first; one invalid row rejects the request with
/// nothing written. Valid rows are then written best-effort, and any row
/// the store could not write turns the response into a partial-import error
/// listing the failed keys.
pub async fn import(
    State(state): State<AppState>,
    payload: Result<Json<Dataset>, JsonRejection>,
) -> Result<ApiResponse<CollectionCounts>, ApiError> {
    let Json(dataset) = payload?;
    let entries = dataset
        .into_entries(Utc::now())
        .map_err(ApiError::validation)?;

    let store = state.store();
    let students = store.import_bulk(Collection::Students.prefix(), entries.students)?;
    let subjects = store.import_bulk(Collection::Subjects.prefix(), entries.subjects)?;

    if !students.is_complete() || !subjects.is_complete() {
        return Err(ApiError::partial_import(
            format!(
                "Imported {} of {} students and {} of {} subjects",
                students.imported(),
                students.total(),
                subjects.imported(),
                subjects.total()
            ),
            json!({
                "students": failed_rows(&students),
                "subjects": failed_rows(&subjects),
            }),
        ));
    }

    let counts = CollectionCounts {
        students: students.imported(),
        subjects: subjects.imported(),
    };
    let message = format!(
        "Imported {} students and {} subjects",
        counts.students, counts.subjects
    );
    Ok(ApiResponse::data(counts).with_message(message))
}

fn failed_rows(report: &ImportReport) -> Vec<serde_json::Value> {
    report
        .outcomes
        .iter()
        .filter(|o| !o.is_ok())
        .map(|o| json!({ "index": o.index, "key": o.key, "error": o.error }))
        .collect()
}

/// Export every student and subject.
pub async fn export(State(state): State<AppState>) -> Result<ApiResponse<Export>, ApiError> {
    let mut all = state.store().export_all(&Collection::prefixes())?;
    let mut take = |c: Collection| all.remove(c.prefix()).unwrap_or_default();
    let export = Export {
        students: take(Collection::Students),
        subjects: take(Collection::Subjects),
    };
    Ok(ApiResponse::data(export))
}

/// Delete every student and subject.
pub async fn clear_all(
    State(state): State<AppState>,
) -> Result<ApiResponse<CollectionCounts>, ApiError> {
    let store = state.store();
    let counts = CollectionCounts {
        students: store.clear(&[Collection::Students.prefix()])?,
        subjects: store.clear(&[Collection::Subjects.prefix()])?,
    };
    let message = format!(
        "Cleared {} students and {} subjects",
        counts.students, counts.subjects
    );
    Ok(ApiResponse::data(counts).with_message(message))
}

/// Write the default subjects under fresh ids.
pub async fn seed(State(state): State<AppState>) -> Result<ApiResponse<CollectionCounts>, ApiError> {
    let entries = seed_entries(Utc::now())?;
    let report = state
        .store()
        .import_bulk(Collection::Subjects.prefix(), entries)?;

    if !report.is_complete() {
        return Err(ApiError::partial_import(
            format!("Seeded {} of {} subjects", report.imported(), report.total()),
            json!({ "subjects": failed_rows(&report) }),
        ));
    }

    let counts = CollectionCounts {
        students: 0,
        subjects: report.imported(),
    };
    Ok(ApiResponse::data(counts).with_message("Default subjects seeded successfully"))
}
