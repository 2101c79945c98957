//! Image processing, pure Rust.
//!
//! | Operation | Used by |
//! |---|---|
//! | **Identify** | Quality Assessor |
//! | **Fingerprint** (DCT mean hash) | Dedup Engine |
//! | **Palette** | Classification Engine (dominant colors) |
//! | **Render** (resize + WebP/AVIF + blur preview) | Derivative Renderer |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, RenderOutput};
pub use calculations::{fill_box, fit_within, plan_size, scale_to_width};
pub use params::{PaletteParams, PreviewParams, Quality, RenderParams, ResizeMode, VariantParams};
pub use rust_backend::{RustBackend, supported_input_extensions};
