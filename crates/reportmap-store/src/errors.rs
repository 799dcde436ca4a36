//! Error handling for reportmap-store
//!
//! Wraps reportmap-core ExError with store-specific helpers

use reportmap_core::errors::{ExError, ExErrorKind};
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Failures raised by the store adapter itself
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Migration {migration_id} failed: {reason}")]
    Migration { migration_id: String, reason: String },

    #[error("Checksum mismatch for migration {migration_id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        migration_id: String,
        expected: String,
        actual: String,
    },

    #[error("Document codec error: {0}")]
    Codec(#[from] serde_yaml::Error),

    #[error("Invalid configuration in {origin}: {reason}")]
    Config { origin: String, reason: String },
}

impl From<StoreError> for ExError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::Migration { .. } => ExError::new(ExErrorKind::Persistence)
                .with_op("migration")
                .with_message(message),
            StoreError::ChecksumMismatch { .. } => ExError::new(ExErrorKind::Persistence)
                .with_op("migration_checksum")
                .with_message(message),
            StoreError::Codec(_) => ExError::new(ExErrorKind::Serialization)
                .with_op("yaml_codec")
                .with_message(message),
            StoreError::Config { .. } => ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(message),
        }
    }
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    StoreError::Migration {
        migration_id: migration_id.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    StoreError::ChecksumMismatch {
        migration_id: migration_id.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
    .into()
}

/// Create a codec error from serde_yaml
pub fn codec_error(err: serde_yaml::Error) -> ExError {
    StoreError::Codec(err).into()
}

/// Create a configuration error
pub fn config_error(origin: &str, reason: impl Into<String>) -> ExError {
    StoreError::Config {
        origin: origin.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Create a database error from rusqlite::Error
///
/// Constraint violations stay `Persistence`; the SQLite message names the
/// constraint.
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_is_persistence() {
        let err = checksum_mismatch("001_initial_schema", "aa", "bb");
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(err.op(), Some("migration_checksum"));
        assert!(err.message().contains("expected aa, got bb"));
    }

    #[test]
    fn test_codec_error_is_serialization() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2").unwrap_err();
        assert_eq!(codec_error(yaml_err).kind(), ExErrorKind::Serialization);
    }

    #[test]
    fn test_config_error_names_origin() {
        let err = config_error("reportmap.toml", "unknown field `dbpath`");
        assert_eq!(err.kind(), ExErrorKind::Config);
        assert!(err.message().contains("reportmap.toml"));
    }
}
