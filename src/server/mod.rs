//! HTTP API server for student-kv.
//!
//! This module exposes the student and subject collections over a JSON API
//! built with axum. Every response uses the `{success, data?, error?, message?}`
//! envelope.

mod config;
mod error;
mod logging;
mod response;
mod routes;
mod state;

pub use config::{
    BackendKind, Config, ConfigError, CorsConfig, LogFormat, LoggingConfig, ServerConfig,
    StoreConfig,
};
pub use error::{ApiError, ErrorResponse};
pub use logging::{init as init_logging, LoggingError};
pub use response::ApiResponse;
pub use routes::router;
pub use state::{AppState, StateError};
