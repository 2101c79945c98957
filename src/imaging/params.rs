//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. The
//! [`render`](crate::render) module decides which outputs are missing and
//! fills in a [`RenderParams`]; the [`backend`](super::backend) does the
//! pixel work. Tests swap in a mock backend without touching this layer.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`ResizeMode`]: Exact scale or fill-and-crop.
//! - [`VariantParams`]: One sized output: path, final dimensions, encoding, quality.
//! - [`PreviewParams`]: The inline blur placeholder box and quality.
//! - [`RenderParams`]: Everything produced from one decode of one source.
//! - [`PaletteParams`]: Palette sampling for dominant colors.

use crate::types::Encoding;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// How the source is mapped onto the output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Scale straight to the output dimensions. Callers compute dimensions
    /// that already preserve the aspect ratio.
    Exact,
    /// Scale to cover the output box, then center-crop.
    Fill,
}

/// One sized, encoded derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantParams {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub mode: ResizeMode,
    pub encoding: Encoding,
    pub quality: Quality,
    /// AVIF encoder speed preset; ignored for WebP.
    pub speed: u8,
}

/// Blur placeholder: shrink to fit the box, encode as lossy WebP.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// A batch of outputs produced from a single decode of `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub variants: Vec<VariantParams>,
    pub preview: Option<PreviewParams>,
}

/// Palette sampling for dominant-color extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteParams {
    /// The image is shrunk to fit a `sample`×`sample` square first.
    pub sample: u32,
    /// More distinct colors than this in the sample yields an empty palette.
    pub max_colors: usize,
    /// Number of most frequent colors returned.
    pub top: usize,
}
