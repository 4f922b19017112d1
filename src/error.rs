//! Error types for StrataKV
//!
//! Provides a unified error type for all operations.
//!
//! Only three things can go wrong at runtime: the single up-front allocation,
//! a bad configuration, or a flusher reporting that it could not write a run.
//! Everything else (wrong state, overflow, reading bounds of a mutable table)
//! is a contract violation and fails loudly via assertion.

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // Allocation Errors
    // -------------------------------------------------------------------------
    #[error("out of memory: failed to reserve {records} records for table \"{label}\"")]
    OutOfMemory {
        /// Diagnostic label of the table that failed to allocate
        label: &'static str,
        /// Requested record capacity
        records: usize,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Flush Errors
    // -------------------------------------------------------------------------
    #[error("flush failed: {0}")]
    Flush(String),
}
