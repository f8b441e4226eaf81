//! Error types for the docshape engine.

use thiserror::Error;

/// All possible errors from the docshape engine.
///
/// The engine is fail-fast: the first violation found during a depth-first
/// walk is returned, never a combined report. Path-carrying variants name
/// the full dotted document path of the offending field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Schema construction errors
    #[error("empty field names are not allowed")]
    EmptyFieldName,

    #[error("definition for schema field '{0}' is invalid: {1}")]
    InvalidField(String, String),

    // Walk / validation errors
    #[error("no document")]
    NotADocument,

    #[error("required document path '{0}' not set")]
    RequiredField(String),

    #[error("document path '{path}' is not a valid {expected}, got {got}")]
    TypeMismatch {
        path: String,
        expected: String,
        got: String,
    },

    #[error("document path '{0}' is not an array")]
    NotAnArray(String),

    #[error("document path '{0}' failed to cast ObjectId")]
    InvalidObjectId(String),

    #[error("malformed ObjectId hex string '{0}'")]
    MalformedObjectId(String),

    #[error("document path '{path}' failed validation: {message}")]
    ValidatorFailed { path: String, message: String },

    // Virtual resolver errors
    #[error("virtual field '{0}' has no source field set")]
    VirtualSourceMissing(String),

    #[error("document path '{path}' rejected by virtual setter: {message}")]
    VirtualRejected { path: String, message: String },

    // Path errors
    #[error("undefined path '{0}' cannot be set")]
    UndefinedPath(String),

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    // Operational errors
    #[error("document matching filter not found")]
    DocumentNotFound,

    #[error("failed to update '{0}'")]
    UpdateFailed(String),

    #[error("insert failed, no identifier returned")]
    InsertFailed,

    #[error("storage error: {0}")]
    Storage(String),

    // Free-form error for hook handlers and virtual functions
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Build a free-form error, for hook handlers and virtual functions.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RequiredField("bar.name".into());
        assert_eq!(err.to_string(), "required document path 'bar.name' not set");

        let err = Error::TypeMismatch {
            path: "age".into(),
            expected: "Int".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "document path 'age' is not a valid Int, got String"
        );

        let err = Error::UndefinedPath("nope".into());
        assert_eq!(err.to_string(), "undefined path 'nope' cannot be set");
    }

    #[test]
    fn custom_error() {
        let err = Error::custom("name must be lowercase");
        assert_eq!(err.to_string(), "name must be lowercase");
    }
}
