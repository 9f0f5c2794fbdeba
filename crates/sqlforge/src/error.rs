//! Error types for sqlforge

use thiserror::Error;

/// Result type alias for query compilation
pub type BuildResult<T> = Result<T, BuildError>;

/// Error types for query compilation.
///
/// All failures are synchronous and non-retryable: they indicate a
/// permanently malformed query model or metadata, never a transient
/// condition.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A criterion kind the active handler set does not support
    #[error("Unsupported criterion: {0}")]
    UnsupportedCriterion(String),

    /// Metadata is missing something the query model requires
    /// (identity, version property, dialect capability)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The query model itself is malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A dotted property path does not resolve against the entity graph
    #[error("Cannot query entity '{entity}' on non-existent property '{property}'")]
    UnknownProperty { entity: String, property: String },
}

impl BuildError {
    /// Create an illegal state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unknown property error
    pub fn unknown_property(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    /// Check if this is an unsupported criterion error
    pub fn is_unsupported_criterion(&self) -> bool {
        matches!(self, Self::UnsupportedCriterion(_))
    }

    /// Check if this is an illegal state error
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Self::IllegalState(_))
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is an unknown property error
    pub fn is_unknown_property(&self) -> bool {
        matches!(self, Self::UnknownProperty { .. })
    }
}
