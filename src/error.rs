//! Error types for the placement engine.
//!
//! Every failure is local to one [`RenderSurface`](crate::RenderSurface) and
//! recoverable by supplying a new source or new geometry. Out-of-range scale
//! and position inputs are never errors: they are clamped.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// All errors the engine can report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The image source could not be rasterized (unsupported format or
    /// corrupt data).
    #[error("failed to decode image: {reason}")]
    DecodeFailure { reason: String },

    /// Zero, negative or non-finite dimensions were supplied where a
    /// positive extent is required.
    #[error("degenerate geometry: {what}")]
    DegenerateGeometry { what: String },

    /// A load completion arrived after a newer request superseded it.
    ///
    /// Not user-visible; callers are expected to drop it.
    #[error("stale completion for load token {token}")]
    StaleCompletion { token: u64 },

    /// A `data:` URL was malformed or carried an unsupported media type.
    #[error("invalid data URL: {reason}")]
    InvalidDataUrl { reason: String },

    /// The base64 payload of a data URL could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Encoding the exported raster failed.
    #[error("failed to encode raster: {0}")]
    Encode(#[from] image::ImageError),

    /// A JSON config or placement profile could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(what: impl Into<String>) -> Self {
        Self::DegenerateGeometry { what: what.into() }
    }

    /// Returns true for superseded completions, which callers should
    /// silently discard rather than surface.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleCompletion { .. })
    }
}
