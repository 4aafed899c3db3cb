use thiserror::Error;

/// Core error type shared across dbslice crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The table model violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A requested engine or feature is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by dbslice crates.
pub type Result<T> = std::result::Result<T, Error>;
