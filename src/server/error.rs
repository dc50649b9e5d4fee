//! API error type and the failure side of the response envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::kv::KvError;
use crate::records::{Collection, ValidationError};

/// Failure body: `{success: false, error, code, details?}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that converts to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Point lookup or update target is absent.
    pub fn not_found(collection: Collection, id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{} not found", collection.singular()),
        )
        .with_details(serde_json::json!({ "collection": collection.name(), "id": id }))
    }

    /// One or more request documents failed validation.
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        let message = match errors.as_slice() {
            [single] => single.to_string(),
            many => format!("{} invalid documents", many.len()),
        };
        let details = errors
            .iter()
            .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
            .collect();
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            .with_details(serde_json::Value::Array(details))
    }

    /// A bulk import did not write every row.
    pub fn partial_import(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_IMPORT", message)
            .with_details(details)
    }

    /// A stored document does not match its record schema.
    pub fn invalid_document(key: &str, err: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INVALID_DOCUMENT",
            format!("Stored document '{}' is not readable: {}", key, err),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log server errors at error level, client errors at debug level
        if self.status.is_server_error() {
            error!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "server error response"
            );
        } else if self.status.is_client_error() {
            debug!(
                status = %self.status.as_u16(),
                code = %self.code,
                message = %self.message,
                "client error response"
            );
        }

        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<KvError> for ApiError {
    fn from(err: KvError) -> Self {
        match &err {
            KvError::StorageUnavailable(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_UNAVAILABLE",
                err.to_string(),
            ),
            KvError::Corrupted { key, .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CORRUPTED_ENTRY",
                err.to_string(),
            )
            .with_details(serde_json::json!({ "key": key })),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation(vec![err])
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_JSON", rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("Serialization failed: {}", err))
    }
}
