//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the pipeline needs:
//! identify, fingerprint, palette, and render.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use
//! [`tests::MockBackend`], which records calls and writes placeholder bytes
//! so filesystem behavior (idempotence, layout) can be checked without
//! encoding pixels.

use super::params::{PaletteParams, RenderParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn max_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

/// Result of a [`ImageBackend::render`] call whose source decoded.
///
/// `variants` is parallel to [`RenderParams::variants`]; each entry is the
/// number of bytes written or the failure for that one output.
#[derive(Debug)]
pub struct RenderOutput {
    pub variants: Vec<Result<u64, BackendError>>,
    pub preview: Option<Result<Vec<u8>, BackendError>>,
}

/// Trait for image processing backends.
///
/// `Sync` so phases can share one backend across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Perceptual fingerprint as a hex string. Visually identical images
    /// produce identical fingerprints.
    fn fingerprint(&self, path: &Path) -> Result<String, BackendError>;

    /// Most frequent RGB colors of a downsampled copy, most frequent first.
    fn palette(&self, path: &Path, params: &PaletteParams)
    -> Result<Vec<[u8; 3]>, BackendError>;

    /// Decode once and produce every requested variant and the preview.
    ///
    /// Returns `Err` only when the source cannot be read or decoded;
    /// per-output failures are reported inside [`RenderOutput`].
    fn render(&self, params: &RenderParams) -> Result<RenderOutput, BackendError>;
}
