//! CRUD handlers shared by every record collection.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;

use crate::kv::{generate_id, Document};
use crate::records::Record;

use super::super::{error::ApiError, response::ApiResponse, state::AppState};

/// List every document in the collection, ordered by key.
pub async fn list<R: Record>(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Document>>, ApiError> {
    let documents = state.store().get_by_prefix(R::COLLECTION.prefix())?;
    Ok(ApiResponse::data(documents))
}

/// Get one document by id.
pub async fn get_one<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Document>, ApiError> {
    let document = state
        .store()
        .get(&R::COLLECTION.key(&id))?
        .ok_or_else(|| ApiError::not_found(R::COLLECTION, &id))?;
    Ok(ApiResponse::data(document))
}

/// Create a record under a generated id.
pub async fn create<R: Record>(
    State(state): State<AppState>,
    payload: Result<Json<R::New>, JsonRejection>,
) -> Result<ApiResponse<R>, ApiError> {
    let Json(new) = payload?;
    let record = R::create(generate_id(), new, Utc::now());
    record.validate()?;

    state
        .store()
        .set(&R::COLLECTION.key(record.id()), &record.to_document()?)?;
    Ok(ApiResponse::data(record))
}

/// Merge a partial update into an existing record.
pub async fn update<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<R::Patch>, JsonRejection>,
) -> Result<ApiResponse<R>, ApiError> {
    let Json(patch) = payload?;
    let key = R::COLLECTION.key(&id);
    let document = state
        .store()
        .get(&key)?
        .ok_or_else(|| ApiError::not_found(R::COLLECTION, &id))?;

    let mut record =
        R::from_document(document).map_err(|e| ApiError::invalid_document(&key, e))?;
    record.apply(patch, Utc::now());
    record.validate()?;

    state.store().set(&key, &record.to_document()?)?;
    Ok(ApiResponse::data(record))
}

/// Delete a record. Deleting an absent id succeeds.
pub async fn remove<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.store().del(&R::COLLECTION.key(&id))?;
    Ok(ApiResponse::message(format!(
        "{} deleted successfully",
        R::COLLECTION.singular()
    )))
}
