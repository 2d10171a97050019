//! Error types for the shadow volume feature

use thiserror::Error;

use crate::pass::custom::PassError;

/// Errors raised by the shadow volume feature and its attachment glue
#[derive(Debug, Clone, Error)]
pub enum ShadowError {
    /// The technique material has not been assigned
    #[error("Please assign {feature}'s material")]
    MissingMaterial {
        /// Name of the feature missing its material
        feature: String,
    },

    /// No pass registry is available to look the feature up in
    #[error("No render pass registry is active")]
    NoPassRegistry,

    /// The feature is not registered with the active pipeline
    #[error("Render feature not found: {0}")]
    FeatureNotFound(String),

    /// The pass was used before being configured, or after disposal
    #[error("Shadow volume pass is {0}")]
    InvalidState(&'static str),

    /// A submission to the render context failed
    #[error(transparent)]
    Submission(#[from] PassError),
}

/// Result type alias
pub type Result<T> = core::result::Result<T, ShadowError>;

impl From<ShadowError> for PassError {
    fn from(e: ShadowError) -> Self {
        match e {
            ShadowError::Submission(inner) => inner,
            ShadowError::MissingMaterial { .. } => PassError::Setup(e.to_string()),
            ShadowError::InvalidState(_) => PassError::Setup(e.to_string()),
            ShadowError::NoPassRegistry | ShadowError::FeatureNotFound(_) => {
                PassError::Resource(e.to_string())
            }
        }
    }
}
