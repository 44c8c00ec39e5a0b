use thiserror::Error;

/// Error type for pool configuration and lifecycle operations
#[derive(Debug, Error)]
pub enum PoolError {
    /// Invalid or out-of-range configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed or unmapped JDBC URL
    #[error("Invalid JDBC URL: {0}")]
    InvalidUrl(String),

    /// Failed to create the backend pool
    #[error("Failed to create pool: {0}")]
    PoolCreationFailed(String),

    /// The checkout timeout elapsed with no connection available
    #[error("Timed out after {0} ms waiting for a connection")]
    CheckoutTimeout(u64),

    /// The pool had no capacity and no way to grow
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Connection validation kept failing after the bounded retry count
    #[error("Connection validation failed after {0} attempts")]
    ValidationFailed(u32),

    /// A pool with this name is already registered
    #[error("Duplicate pool name: {0}")]
    DuplicateName(String),

    /// Operation invoked outside the Started lifecycle state
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;
