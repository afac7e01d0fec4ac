use crate::core::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("Failed to open store '{store}': {reason}")]
    StoreOpen { store: String, reason: String },

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Save error: {0}")]
    SaveError(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DbError {
    /// Open failures are sticky: the stack never retries them.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::StoreOpen { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for DbError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for DbError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
