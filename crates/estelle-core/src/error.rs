//! Error types for the estelle mapping layer.
//!
//! All failures surfaced to callers carry a stable, string-namespaced error
//! code (see [`EstelleError::code`]). Codes are part of the public contract:
//! callers match on them, so they never change between releases.

use thiserror::Error;

/// The primary error type for the estelle mapping layer.
///
/// Errors fall into three categories:
///
/// - **setup errors** - no storage backend configured ([`NoConnection`](Self::NoConnection));
/// - **validation errors** - raised before any I/O, always recoverable by
///   fixing the data and retrying;
/// - **backend errors** - propagated from the storage backend unchanged in
///   [`Backend`](Self::Backend), never reinterpreted, except
///   [`UnsupportedOperation`](Self::UnsupportedOperation) which the layer
///   itself raises pre-flight for dialect-gated operations.
///
/// There is no automatic retry anywhere in this layer.
#[derive(Error, Debug)]
pub enum EstelleError {
    /// No storage backend has been bound to the model.
    #[error("no storage backend configured")]
    NoConnection,

    /// A present field does not exist in the model's schema.
    #[error("field '{0}' is not defined in the schema")]
    UnrecognizedKey(String),

    /// A value's runtime kind does not match the field's declared type class.
    #[error("field '{field}' holds a value of the wrong kind (expected {expected})")]
    UnacceptedType {
        /// The offending field name.
        field: String,
        /// The declared type class the value failed to match.
        expected: String,
    },

    /// No validator could be resolved for a field. This is a configuration
    /// defect in the schema, not a data defect.
    #[error("field '{0}' has no validator")]
    NoValidator(String),

    /// A field's validator rejected the value.
    #[error("field '{0}' failed validation")]
    ValidationFailed(String),

    /// A required field is absent from the entity.
    #[error("required field '{0}' is missing")]
    MissingRequired(String),

    /// A type descriptor has no column type mapped for the target dialect.
    #[error("type '{descriptor}' has no column type for dialect '{dialect}'")]
    NoColumnType {
        /// The descriptor name.
        descriptor: String,
        /// The dialect that was requested.
        dialect: String,
    },

    /// A stored value could not be deserialized back into application form.
    #[error("field '{field}' could not be deserialized: {message}")]
    Deserialization {
        /// The field whose stored value was malformed.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// A model was registered with an inconsistent configuration.
    #[error("model configuration error: {0}")]
    Configuration(String),

    /// An INSERT was rejected by the storage backend.
    #[error("insertion failed: {0}")]
    Insertion(String),

    /// The operation is not expressible on the connected backend's dialect.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Any other storage backend failure, passed through unchanged.
    #[error("backend error: {0}")]
    Backend(String),
}

impl EstelleError {
    /// Returns the stable, string-namespaced code for this error.
    ///
    /// These codes mirror the original error vocabulary of the layer and are
    /// safe to match on across versions.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoConnection => "no-connection",
            Self::UnrecognizedKey(_) => "validation.unrecognizedKey",
            Self::UnacceptedType { .. } => "validation.unacceptedType",
            Self::NoValidator(_) => "validation.noValidator",
            Self::ValidationFailed(_) => "validation.validationFailed",
            Self::MissingRequired(_) => "validation.missingRequired",
            Self::NoColumnType { .. } => "schema.noColumnType",
            Self::Deserialization { .. } => "serialization.deserialization",
            Self::Configuration(_) => "configuration",
            Self::Insertion(_) => "sql.insertion",
            Self::UnsupportedOperation(_) => "unsupportedOperation",
            Self::Backend(_) => "sql.backend",
        }
    }

    /// Returns `true` for errors raised by validation, before any I/O.
    ///
    /// Validation errors are always recoverable: fix the data and retry.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedKey(_)
                | Self::UnacceptedType { .. }
                | Self::NoValidator(_)
                | Self::ValidationFailed(_)
                | Self::MissingRequired(_)
        )
    }
}

/// A convenience type alias for `Result<T, EstelleError>`.
pub type EstelleResult<T> = Result<T, EstelleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(EstelleError::NoConnection.code(), "no-connection");
        assert_eq!(
            EstelleError::UnrecognizedKey("x".into()).code(),
            "validation.unrecognizedKey"
        );
        assert_eq!(
            EstelleError::UnacceptedType {
                field: "x".into(),
                expected: "text".into()
            }
            .code(),
            "validation.unacceptedType"
        );
        assert_eq!(
            EstelleError::NoValidator("x".into()).code(),
            "validation.noValidator"
        );
        assert_eq!(
            EstelleError::ValidationFailed("x".into()).code(),
            "validation.validationFailed"
        );
        assert_eq!(
            EstelleError::MissingRequired("x".into()).code(),
            "validation.missingRequired"
        );
        assert_eq!(
            EstelleError::NoColumnType {
                descriptor: "str".into(),
                dialect: "mysql".into()
            }
            .code(),
            "schema.noColumnType"
        );
        assert_eq!(EstelleError::Insertion("dup".into()).code(), "sql.insertion");
        assert_eq!(
            EstelleError::UnsupportedOperation("upsert".into()).code(),
            "unsupportedOperation"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(EstelleError::MissingRequired("name".into()).is_validation());
        assert!(EstelleError::ValidationFailed("name".into()).is_validation());
        assert!(!EstelleError::NoConnection.is_validation());
        assert!(!EstelleError::Backend("boom".into()).is_validation());
    }

    #[test]
    fn test_display() {
        let err = EstelleError::MissingRequired("name".into());
        assert_eq!(err.to_string(), "required field 'name' is missing");

        let err = EstelleError::NoColumnType {
            descriptor: "point".into(),
            dialect: "sqlite".into(),
        };
        assert!(err.to_string().contains("point"));
        assert!(err.to_string().contains("sqlite"));
    }
}
