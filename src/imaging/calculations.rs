//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! None of them upscale: a source smaller than the requested box yields a
//! proportionally smaller output.

use super::backend::Dimensions;
use super::params::ResizeMode;
use crate::config::SizeSpec;

/// Shrink `source` to fit inside a `box_w`×`box_h` box, preserving aspect ratio.
///
/// # Examples
/// ```
/// # use photo_pipeline::imaging::{Dimensions, fit_within};
/// let dims = fit_within(Dimensions { width: 400, height: 200 }, 20, 20);
/// assert_eq!((dims.width, dims.height), (20, 10));
/// ```
pub fn fit_within(source: Dimensions, box_w: u32, box_h: u32) -> Dimensions {
    if source.width <= box_w && source.height <= box_h {
        return source;
    }
    let ratio = (box_w as f64 / source.width as f64).min(box_h as f64 / source.height as f64);
    Dimensions {
        width: ((source.width as f64 * ratio).round() as u32).max(1),
        height: ((source.height as f64 * ratio).round() as u32).max(1),
    }
}

/// Scale `source` down to `width`, preserving aspect ratio.
pub fn scale_to_width(source: Dimensions, width: u32) -> Dimensions {
    if source.width <= width {
        return source;
    }
    let height = (source.height as f64 * width as f64 / source.width as f64).round() as u32;
    Dimensions {
        width,
        height: height.max(1),
    }
}

/// Output box for a fill-and-crop derivative.
///
/// When the source covers the box, the box is returned unchanged. Otherwise
/// the box shrinks by the limiting axis so the crop still has the requested
/// aspect ratio without upscaling.
pub fn fill_box(source: Dimensions, box_w: u32, box_h: u32) -> Dimensions {
    if source.width >= box_w && source.height >= box_h {
        return Dimensions {
            width: box_w,
            height: box_h,
        };
    }
    let width_limited =
        source.width as f64 / box_w as f64 <= source.height as f64 / box_h as f64;
    if width_limited {
        let height = (box_h as f64 * source.width as f64 / box_w as f64).round() as u32;
        Dimensions {
            width: source.width,
            height: height.clamp(1, source.height),
        }
    } else {
        let width = (box_w as f64 * source.height as f64 / box_h as f64).round() as u32;
        Dimensions {
            width: width.clamp(1, source.width),
            height: source.height,
        }
    }
}

/// Final dimensions and resize mode for one catalog entry.
pub fn plan_size(source: Dimensions, spec: &SizeSpec) -> (Dimensions, ResizeMode) {
    match spec.height {
        Some(height) => (fill_box(source, spec.width, height), ResizeMode::Fill),
        None => (scale_to_width(source, spec.width), ResizeMode::Exact),
    }
}
