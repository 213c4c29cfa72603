//! Error types for the font crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building fonts or drawing text.
#[derive(Error, Debug)]
pub enum FontError {
    /// The typeface file could not be read or parsed.
    #[error("failed to load typeface {path:?}: {reason}")]
    TypefaceLoad { path: PathBuf, reason: String },

    /// The requested atlas dimensions are zero or exceed [`MAX_ATLAS_SIZE`](crate::MAX_ATLAS_SIZE).
    #[error("invalid atlas size: {width}x{height}")]
    InvalidAtlasSize { width: u32, height: u32 },

    /// The rendering backend reported a failure.
    #[error("render backend error: {0}")]
    Backend(String),

    /// The render target is not known to the backend.
    #[error("unknown render target")]
    UnknownTarget,

    /// No suitable graphics adapter was found.
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    /// Failed to request a graphics device.
    #[error("failed to request graphics device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Result type for font operations.
pub type FontResult<T> = Result<T, FontError>;
