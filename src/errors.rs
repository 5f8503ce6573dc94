use std::path::PathBuf;

use thiserror::Error;

use crate::infrastructure::container::ContainerError;

/// Failure raised by a service factory while building its value.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unsupported database type ({0})")]
    UnsupportedDatabaseType(String),
    #[error("could not read the database")]
    DatabaseUnreadable {
        path: PathBuf,
        #[source]
        source: DatabaseReadError,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Dependency(#[from] ContainerError),
    #[error("I/O error while {0}: {1}")]
    IO(String, #[source] std::io::Error),
}

impl ServiceError {
    /// Whether the process should stop instead of running with this service broken.
    pub fn is_fatal(&self) -> bool {
        match self {
            ServiceError::UnsupportedDatabaseType(_)
            | ServiceError::DatabaseUnreadable { .. }
            | ServiceError::Config(_)
            | ServiceError::IO(..) => true,
            ServiceError::Storage(_) => false,
            ServiceError::Dependency(err) => err.is_fatal(),
        }
    }
}

/// Why the persisted database file could not be loaded.
#[derive(Debug, Error)]
pub enum DatabaseReadError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("invalid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid state: {0}")]
    State(#[source] StorageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Required configuration field '{0}' is missing or invalid")]
    FieldMissing(String),
    #[error("Configuration field '{key}' should be {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("Other Config Error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("no such table: {0}")]
    NoSuchTable(String),
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
    #[error("column '{table}.{column}' expects {expected}, got {actual}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
        actual: String,
    },
    #[error("duplicate value {value} for unique column '{table}.{column}'")]
    UniqueViolation {
        table: String,
        column: String,
        value: String,
    },
    #[error("invalid row in table '{table}': {reason}")]
    InvalidRow { table: String, reason: String },
    #[error("failed to write '{0}': {1}")]
    Write(String, #[source] std::io::Error),
    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ServiceError::UnsupportedDatabaseType("mysql".into()).is_fatal());
        assert!(!ServiceError::Storage(StorageError::NoSuchTable("x".into())).is_fatal());

        let nested = ServiceError::Dependency(ContainerError::Creation {
            id: "database".into(),
            source: Box::new(ServiceError::UnsupportedDatabaseType("sql".into())),
        });
        assert!(nested.is_fatal());

        let missing = ServiceError::Dependency(ContainerError::NoSuchEntry { id: "config".into() });
        assert!(!missing.is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = ServiceError::UnsupportedDatabaseType("mysql".into());
        assert_eq!(err.to_string(), "unsupported database type (mysql)");

        let err = ServiceError::DatabaseUnreadable {
            path: PathBuf::from("/tmp/db.json"),
            source: DatabaseReadError::Read(std::io::Error::other("boom")),
        };
        assert_eq!(err.to_string(), "could not read the database");
    }
}
