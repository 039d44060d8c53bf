use thiserror::Error as ThisError;

///
/// Error
///
/// The complete failure surface of the collection. Every public operation
/// returns exactly one of these kinds; nothing is retried internally and
/// nothing escapes as a panic.
///

#[derive(Debug, ThisError)]
pub enum Error {
    /// An operation requiring a bound table was called before `bind`.
    #[error("no table is bound to this session")]
    NotBound,

    /// A position or slice bound falls outside the valid range for the
    /// current length.
    #[error("position {position} out of range for length {len}")]
    OutOfRange { position: i64, len: usize },

    /// A supplied row or argument does not have the required shape.
    #[error("{message}")]
    TypeMismatch { message: String },

    /// An invalid datatype token, identifier, or constraint combination.
    #[error("{message}")]
    SchemaInvalid { message: String },

    /// No row satisfies the given predicates or position.
    #[error("no row satisfies the given predicates")]
    NoMatch,

    /// The backing store could not be opened or failed at the I/O level.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn schema_invalid(message: impl Into<String>) -> Self {
        Self::SchemaInvalid {
            message: message.into(),
        }
    }
}
