//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Identify | `ImageReader::into_dimensions` (sniffed format, header only) |
//! | Fingerprint | `image_hasher` mean hash over DCT-preprocessed 8×8 |
//! | Palette | `DynamicImage::thumbnail_exact` + color histogram |
//! | Resize | `resize_exact` / `resize_to_fill` with `Lanczos3` |
//! | Encode → WebP | `webp::Encoder` (libwebp, lossy) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//!
//! Outputs are written to `<name>.part` and renamed into place, so an
//! interrupted run never leaves a truncated file at a final path.

use super::backend::{BackendError, Dimensions, ImageBackend, RenderOutput};
use super::calculations::fit_within;
use super::params::{PaletteParams, PreviewParams, RenderParams, ResizeMode, VariantParams};
use crate::types::Encoding;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, HasherConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions the registry accepts. GIFs contribute their first frame.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Returns the set of image file extensions the pipeline ingests.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// Write `bytes` next to `path` and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64, BackendError> {
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    std::fs::write(&part, bytes)?;
    std::fs::rename(&part, path)?;
    Ok(bytes.len() as u64)
}

fn encode(
    img: &DynamicImage,
    encoding: Encoding,
    quality: u32,
    speed: u8,
) -> Result<Vec<u8>, BackendError> {
    match encoding {
        Encoding::Webp => {
            let encoder = webp::Encoder::from_image(img).map_err(|e| {
                BackendError::ProcessingFailed(format!("WebP encode failed: {e}"))
            })?;
            Ok(encoder.encode(quality as f32).to_vec())
        }
        Encoding::Avif => {
            let mut buf = Vec::new();
            let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buf,
                speed,
                quality as u8,
            );
            img.write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("AVIF encode failed: {e}")))?;
            Ok(buf)
        }
    }
}

fn render_variant(img: &DynamicImage, variant: &VariantParams) -> Result<u64, BackendError> {
    let same_size = img.width() == variant.width && img.height() == variant.height;
    let resized = match variant.mode {
        _ if same_size => img.clone(),
        ResizeMode::Exact => img.resize_exact(variant.width, variant.height, FilterType::Lanczos3),
        ResizeMode::Fill => img.resize_to_fill(variant.width, variant.height, FilterType::Lanczos3),
    };
    let bytes = encode(
        &resized,
        variant.encoding,
        variant.quality.value(),
        variant.speed,
    )?;
    write_atomic(&variant.output, &bytes)
}

fn render_preview(img: &DynamicImage, preview: &PreviewParams) -> Result<Vec<u8>, BackendError> {
    let source = Dimensions {
        width: img.width(),
        height: img.height(),
    };
    let target = fit_within(source, preview.width, preview.height);
    let small = img.resize_exact(target.width, target.height, FilterType::Lanczos3);
    encode(&small, Encoding::Webp, preview.quality.value(), 0)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Dimensions { width, height })
    }

    fn fingerprint(&self, path: &Path) -> Result<String, BackendError> {
        let img = load_image(path)?;
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .hash_size(8, 8)
            .to_hasher();
        let hash = hasher.hash_image(&img);
        Ok(hash
            .as_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }

    fn palette(
        &self,
        path: &Path,
        params: &PaletteParams,
    ) -> Result<Vec<[u8; 3]>, BackendError> {
        let img = load_image(path)?;
        let source = Dimensions {
            width: img.width(),
            height: img.height(),
        };
        let target = fit_within(source, params.sample, params.sample);
        let sample = if target == source {
            img.to_rgb8()
        } else {
            img.thumbnail_exact(target.width, target.height).to_rgb8()
        };

        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
        for pixel in sample.pixels() {
            *counts.entry(pixel.0).or_default() += 1;
            if counts.len() > params.max_colors {
                return Ok(Vec::new());
            }
        }

        // Most frequent first; ties broken by the brighter channel values.
        let mut ranked: Vec<([u8; 3], usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
        Ok(ranked
            .into_iter()
            .take(params.top)
            .map(|(color, _)| color)
            .collect())
    }

    fn render(&self, params: &RenderParams) -> Result<RenderOutput, BackendError> {
        // Alpha is dropped: every output encoding is opaque.
        let img = DynamicImage::ImageRgb8(load_image(&params.source)?.to_rgb8());
        let variants = params
            .variants
            .iter()
            .map(|variant| render_variant(&img, variant))
            .collect();
        let preview = params
            .preview
            .as_ref()
            .map(|preview| render_preview(&img, preview));
        Ok(RenderOutput { variants, preview })
    }
}
