//! Crate-wide error type.

use thiserror::Error;

use crate::manager::ConfigError;

/// Result type used throughout the advisor.
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Errors surfaced by the advisor and its tracking helpers.
///
/// Depth refusals and unknown sites are ordinary outcomes and never show up here.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// An entity does not expose the requested association.
    #[error("property `{property}` not found on `{entity}`")]
    PropertyNotFound {
        /// Entity type name reported by the capability.
        entity: String,
        /// Association name that was requested.
        property: String,
    },
    /// A caller supplied a value outside its accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Configuration could not be read, parsed or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AdvisorError {
    pub(crate) fn property_not_found(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            entity: entity.into(),
            property: property.into(),
        }
    }
}
