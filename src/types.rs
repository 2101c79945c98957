//! Shared value types used across pipeline phases and output documents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a source image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Scraped from a website by the crawl collaborator.
    Website,
    /// Copied in from a local folder.
    Local,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Website => write!(f, "website"),
            Origin::Local => write!(f, "local"),
        }
    }
}

/// Capability tags derived from image width.
///
/// Declaration order is the order tags appear in output documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageClass {
    HeroBanner,
    OgImage,
    Gallery,
    Thumbnail,
}

impl UsageClass {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageClass::HeroBanner => "hero-banner",
            UsageClass::OgImage => "og-image",
            UsageClass::Gallery => "gallery",
            UsageClass::Thumbnail => "thumbnail",
        }
    }
}

/// Output encodings produced for every sized derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Lossy web raster.
    Webp,
    /// High-efficiency AV1 still image.
    Avif,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::Webp, Encoding::Avif];

    /// File extension, also used as the top-level derivative directory name.
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Webp => "webp",
            Encoding::Avif => "avif",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Pipeline phase an [`ItemError`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Registry,
    Dedup,
    Quality,
    Classify,
    Organize,
    Render,
    Aggregate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Registry => "registry",
            Phase::Dedup => "dedup",
            Phase::Quality => "quality",
            Phase::Classify => "classify",
            Phase::Organize => "organize",
            Phase::Render => "render",
            Phase::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Unreadable or corrupt source image.
    Decode,
    /// Resize or transcode failure for one derivative.
    Encode,
    /// Filesystem failure reading a source or writing a destination.
    Io,
}

/// A per-item failure. Collected into the run report, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub path: String,
    pub phase: Phase,
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn new(
        path: impl Into<String>,
        phase: Phase,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            phase,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_class_serializes_kebab_case() {
        let json = serde_json::to_string(&UsageClass::HeroBanner).unwrap();
        assert_eq!(json, "\"hero-banner\"");
        let json = serde_json::to_string(&UsageClass::OgImage).unwrap();
        assert_eq!(json, "\"og-image\"");
    }

    #[test]
    fn usage_class_order_matches_declaration() {
        let mut classes = vec![
            UsageClass::Thumbnail,
            UsageClass::HeroBanner,
            UsageClass::Gallery,
        ];
        classes.sort();
        assert_eq!(
            classes,
            vec![UsageClass::HeroBanner, UsageClass::Gallery, UsageClass::Thumbnail]
        );
    }

    #[test]
    fn origin_parses_lowercase() {
        let origin: Origin = serde_json::from_str("\"website\"").unwrap();
        assert_eq!(origin, Origin::Website);
        assert_eq!(Origin::Local.to_string(), "local");
    }

    #[test]
    fn item_error_display_includes_phase_and_path() {
        let err = ItemError::new("raw/a.jpg", Phase::Dedup, ErrorKind::Decode, "bad header");
        assert_eq!(err.to_string(), "[dedup] raw/a.jpg: bad header");
    }
}
