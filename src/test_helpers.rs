//! Shared test utilities for the photo-pipeline test suite.
//!
//! Provides synthetic image fixtures, record builders, and lookups that
//! panic with a readable message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("raw/local/goa-beach.jpg"), 400, 300);
//!
//! let record = discovered("goa-beach.jpg");
//! assert_eq!(record.stem(), "goa-beach");
//! ```

use std::path::{Path, PathBuf};

use crate::classify::{Classification, Setting};
use crate::record::Discovered;
use crate::types::Origin;

// =========================================================================
// Image fixtures
// =========================================================================

fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Write a gradient JPEG, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

/// Write a gradient PNG. The same size always gives the same pixels, so two
/// calls produce perceptual duplicates.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// Record builders
// =========================================================================

/// A local registry entry at `/photos/<relative>` with no context.
pub fn discovered(relative: &str) -> Discovered {
    Discovered {
        path: PathBuf::from("/photos").join(relative),
        source: format!("raw/local/{relative}"),
        relative: relative.to_string(),
        origin: Origin::Local,
        context: None,
    }
}

/// A fixed Goa beach classification with the given slug.
pub fn sample_classification(slug: &str) -> Classification {
    Classification {
        location: "goa".into(),
        venue_type: "beach".into(),
        event_type: "wedding".into(),
        service_type: None,
        primary_category: "venue".into(),
        secondary_category: "couple-portrait".into(),
        setting: Setting::Outdoor,
        subjects: vec!["couple-portrait".into()],
        elements: vec!["elegant-decor".into()],
        dominant_colors: Vec::new(),
        description: "couple-portrait at beach venue in Goa".into(),
        alt_text: "Couple-Portrait - Goa beach".into(),
        title: "couple-portrait at beach venue in Goa".into(),
        slug: slug.to_string(),
    }
}

// =========================================================================
// Lookups
// =========================================================================

/// Find a JSON array element whose `key` equals `value`. Panics if not found.
pub fn find_by<'a>(items: &'a [serde_json::Value], key: &str, value: &str) -> &'a serde_json::Value {
    items
        .iter()
        .find(|item| item[key] == value)
        .unwrap_or_else(|| {
            let seen: Vec<&serde_json::Value> = items.iter().map(|i| &i[key]).collect();
            panic!("no item with {key} = '{value}'. Available: {seen:?}")
        })
}

/// Relative paths of every regular file under `root`, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| crate::record::slash_path(p))
        })
        .collect();
    files.sort();
    files
}
