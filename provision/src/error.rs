//! Declaration-phase errors.
//!
//! Everything here is fatal: a failed descriptor or builder aborts the
//! whole declaration, and no partial orchestration is retained.
//! Resolution-time failures (remote creation) are the engine's concern and
//! are deliberately absent from this taxonomy.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for declaration-phase operations.
pub type Result<T> = std::result::Result<T, DeclareError>;

/// Errors raised while declaring a deployment.
#[derive(Debug, Error)]
pub enum DeclareError {
    /// The stack configuration failed validation before any declaration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A builder rejected its inputs.
    #[error("component `{component}`: {reason}")]
    Component {
        /// The offending component's name.
        component: String,
        /// Why its inputs were rejected.
        reason: String,
    },
}

impl DeclareError {
    pub(crate) fn component(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            reason: reason.into(),
        }
    }
}
