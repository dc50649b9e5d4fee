//! Conditional logging macros for library-level tracing.
//!
//! With the `logging` feature the macros forward to `tracing`; without it
//! they expand to nothing. Binaries install their own subscriber.
//!
//! ```rust,ignore
//! use crate::logging::{debug, info};
//!
//! info!(path = %path.display(), "opening store");
//! debug!(prefix = prefix, count = docs.len(), "prefix scan");
//! ```

#[cfg(feature = "logging")]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => { tracing::$level!($($arg)*) };
}

#[cfg(not(feature = "logging"))]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {};
}

/// Per-key reads and writes.
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::logging::emit!(trace, $($arg)*) };
}

/// Scans, batch sizes, generated keys.
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::logging::emit!(debug, $($arg)*) };
}

/// Store lifecycle and bulk operations.
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::logging::emit!(info, $($arg)*) };
}

/// Per-entry import failures.
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::logging::emit!(warn, $($arg)*) };
}

/// Backend failures that propagate to callers.
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::logging::emit!(error, $($arg)*) };
}

pub(crate) use emit;
pub(crate) use log_debug as debug;
pub(crate) use log_error as error;
pub(crate) use log_info as info;
pub(crate) use log_trace as trace;
pub(crate) use log_warn as warn;
