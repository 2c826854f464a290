//! Error types for the Granary service.

use thiserror::Error;

/// Main error type for Granary operations.
///
/// Quota denials are not errors; they are the `Denied` arm of
/// [`crate::quota::Decision`]. An `Err` from the decision path always
/// means the request could not be evaluated at all.
#[derive(Error, Debug)]
pub enum GranaryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared store errors (connection, timeout, script failure)
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Granary operations.
pub type Result<T> = std::result::Result<T, GranaryError>;
