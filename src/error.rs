//! # Error Types
//!
//! This module defines error types used throughout the photobox library.
//!
//! The taxonomy follows the recovery model of the system: validation errors
//! are rejected synchronously with no partial state written, camera errors
//! leave the capture flow in the browsing state, and nothing here is fatal
//! to the process.

use thiserror::Error;

/// Main error type for photobox operations
#[derive(Debug, Error)]
pub enum PhotoboxError {
    /// Input validation failure (missing name/file/slot, non-PNG upload,
    /// malformed config JSON). Rejected before any state is written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Camera acquisition or stream lifecycle failure
    #[error("Camera error: {0}")]
    Camera(String),

    /// A requested resource (template, session) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image decoding or compositing error
    #[error("Image error: {0}")]
    Image(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
