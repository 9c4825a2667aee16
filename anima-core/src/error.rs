//! Error types for the anima core library.

use thiserror::Error;

/// Top-level error type for anima storage and configuration operations.
///
/// State-mutating operations on the engine never return this type; they
/// clamp, log, or skip instead. It surfaces from loading configuration and
/// from the record store.
#[derive(Error, Debug)]
pub enum AnimaError {
    /// An identifier (emotion, event tag, domain, characteristic kind) was
    /// not recognised.
    #[error("Unknown {kind}: {name}")]
    UnknownIdentifier {
        /// What sort of identifier was being parsed.
        kind: &'static str,
        /// The raw text that failed to parse.
        name: String,
    },

    /// A characteristic with the given ID was not found.
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(crate::CharacteristicId),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnimaError {
    /// Build an [`AnimaError::UnknownIdentifier`].
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownIdentifier {
            kind,
            name: name.into(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AnimaError>;
