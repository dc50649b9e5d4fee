//! Grade sheet and dashboard handlers.

use axum::extract::{Path, State};

use crate::kv::KvStore;
use crate::records::{Collection, Record, Student, Subject};
use crate::report::{DashboardStats, GradeSheet};

use super::super::{error::ApiError, response::ApiResponse, state::AppState};

/// Decode every record in a collection.
fn load_all<R: Record>(store: &KvStore) -> Result<Vec<R>, ApiError> {
    store
        .entries_by_prefix(R::COLLECTION.prefix())?
        .into_iter()
        .map(|entry| {
            R::from_document(entry.value).map_err(|e| ApiError::invalid_document(&entry.key, e))
        })
        .collect()
}

/// Grade sheet for one student.
pub async fn student_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<GradeSheet>, ApiError> {
    let store = state.store();
    let key = Collection::Students.key(&id);
    let document = store
        .get(&key)?
        .ok_or_else(|| ApiError::not_found(Collection::Students, &id))?;
    let student =
        Student::from_document(document).map_err(|e| ApiError::invalid_document(&key, e))?;

    let subjects = load_all::<Subject>(store)?;
    Ok(ApiResponse::data(GradeSheet::for_student(&student, &subjects)))
}

/// Dashboard totals.
pub async fn stats(State(state): State<AppState>) -> Result<ApiResponse<DashboardStats>, ApiError> {
    let store = state.store();
    let students = load_all::<Student>(store)?;
    let subjects = load_all::<Subject>(store)?;
    Ok(ApiResponse::data(DashboardStats::compute(&students, &subjects)))
}
