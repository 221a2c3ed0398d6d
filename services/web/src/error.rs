//! services/web/src/error.rs
//!
//! Defines the error type for starting and running the web service.
//! Request-level errors live in `web::error`.

/// The primary error type for the `web` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// A page template failed to compile at startup.
    #[error("Template Error: {0}")]
    Template(#[from] minijinja::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
