use thiserror::Error;

/// Errors surfaced by the byte-level operations and engine construction.
///
/// Provider problems never appear here; they are recovered inside the
/// engine and reported through [`crate::RegionCrop`] or [`MaskUnavailable`].
#[derive(Debug, Error)]
pub enum FitError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("unknown region target: {0:?}")]
    UnknownTarget(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reported by an external capability provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The model could not be loaded.
    #[error("{provider} unavailable: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },

    /// The model was loaded but raised during inference.
    #[error("{provider} inference failed: {reason}")]
    Inference {
        provider: &'static str,
        reason: String,
    },
}

impl ProviderError {
    pub fn unavailable(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            provider,
            reason: reason.into(),
        }
    }

    pub fn inference(provider: &'static str, reason: impl Into<String>) -> Self {
        ProviderError::Inference {
            provider,
            reason: reason.into(),
        }
    }

    /// Name of the provider that failed.
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Unavailable { provider, .. } => provider,
            ProviderError::Inference { provider, .. } => provider,
        }
    }
}

/// Why a fitting mask could not be synthesized.
#[derive(Debug, Clone, Error)]
pub enum MaskUnavailable {
    /// The segmenter ran but reported no person instance.
    #[error("no person segmentation available")]
    NoSegmentation,

    #[error("segmentation provider failed: {0}")]
    Segmenter(ProviderError),

    #[error("pose provider failed: {0}")]
    Pose(ProviderError),
}
