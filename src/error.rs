//! Error types for the cache store.

use thiserror::Error;

/// Errors that can occur in cache store operations.
///
/// Configuration problems ([`CacheError::Config`],
/// [`CacheError::InvalidCleaningMode`]) are fatal and raised immediately.
/// Driver faults surface as [`CacheError::Store`] on the invalidation and
/// listing paths; the read and save paths downgrade them to a miss or
/// `false` instead (see [`crate::backend::TagCacheBackend`]).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend configuration is unusable.
    #[error("invalid cache configuration: {0}")]
    Config(String),

    /// A cleaning-mode string did not name a known mode.
    #[error("invalid cleaning mode: {0}")]
    InvalidCleaningMode(String),

    /// The MongoDB driver reported a fault.
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

/// Convenience alias for cache store results.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display_shows_message() {
        let err = CacheError::Config("collection name must be non-empty".to_owned());
        assert_eq!(err.to_string(), "invalid cache configuration: collection name must be non-empty");
    }

    #[test]
    fn invalid_mode_display_names_mode() {
        let err = CacheError::InvalidCleaningMode("newest".to_owned());
        assert!(err.to_string().contains("newest"));
    }

    #[test]
    fn implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<CacheError>();
    }
}
