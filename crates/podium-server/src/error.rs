//! Podium server error types.

use podium_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors of the server process.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tracing or exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// A domain operation failed during startup or bootstrap.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Signal handling or other I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("PODIUM_DEMO_PLAYERS must be a number".to_owned());

        assert_eq!(
            err.to_string(),
            "configuration error: PODIUM_DEMO_PLAYERS must be a number"
        );
    }

    #[test]
    fn test_domain_error_converts() {
        let id = Uuid::nil();

        let err: AppError = DomainError::AggregateNotFound(id).into();

        assert!(matches!(err, AppError::Domain(DomainError::AggregateNotFound(_))));
        assert!(err.to_string().starts_with("domain error: "));
    }
}
