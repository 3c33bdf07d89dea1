//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use thiserror::Error;

/// Custom error type for the upload system
#[derive(Error, Debug)]
pub enum UploadError {
    /// A required configuration field is missing or invalid
    #[error("Upload configuration error: {0}")]
    Configuration(String),

    /// Error occurred while reading or writing the settings store
    #[error("Settings store error: {0}")]
    Store(#[source] std::io::Error),

    /// Error occurred while encoding or decoding stored settings
    #[error("Settings serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Error occurred during a source file operation (move/delete)
    #[error("File operation error: {0}")]
    File(#[source] std::io::Error),

    /// Error occurred while scheduling or cancelling a job
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

/// Type alias for Result with UploadError
pub type UploadResult<T> = Result<T, UploadError>;
