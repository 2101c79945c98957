//! Per-image record, one type per pipeline state.
//!
//! ```text
//! Discovered ─dedup─▶ Deduped ─assess─▶ Assessed ─classify─▶ Classified
//!                                                               │
//!                      Rendered ◀─render─ Organized ◀─organize──┘
//! ```
//!
//! Each transition consumes the previous state and wraps it, so fields set
//! by an earlier phase can be read through `Deref` but never replaced, and a
//! phase cannot be handed a record that skipped its predecessor.

use crate::classify::Classification;
use crate::imaging::Dimensions;
use crate::types::{Encoding, Origin, UsageClass};
use serde::Serialize;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// A source file as enumerated by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered {
    /// Absolute (or root-joined) path to the original bytes.
    pub path: PathBuf,
    /// Path shown in documents and reports, relative to the project root.
    pub source: String,
    /// Path relative to the source tree it was found in. Classification text.
    pub relative: String,
    pub origin: Origin,
    /// Alt text or page URL supplied alongside the file.
    pub context: Option<String>,
}

impl Discovered {
    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased extension of the original, `"jpg"` when missing.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "jpg".to_string())
    }

    pub fn dedup(self, fingerprint: String) -> Deduped {
        Deduped {
            image: self,
            fingerprint,
        }
    }
}

/// A registry entry that won its fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduped {
    image: Discovered,
    fingerprint: String,
}

impl Deduped {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn assess(self, assessment: Assessment) -> Assessed {
        Assessed {
            image: self,
            assessment,
        }
    }
}

impl Deref for Deduped {
    type Target = Discovered;
    fn deref(&self) -> &Discovered {
        &self.image
    }
}

/// Output of the quality assessor for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// `None` when the image could not be decoded.
    pub dimensions: Option<Dimensions>,
    pub quality_score: u8,
    pub usage: Vec<UsageClass>,
}

impl Assessment {
    /// Assessment for a source that failed to decode.
    pub fn undecodable() -> Self {
        Self {
            dimensions: None,
            quality_score: 0,
            usage: Vec::new(),
        }
    }

    pub fn has_usage(&self, class: UsageClass) -> bool {
        self.usage.contains(&class)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessed {
    image: Deduped,
    assessment: Assessment,
}

impl Assessed {
    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn classify(self, classification: Classification) -> Classified {
        Classified {
            image: self,
            classification,
        }
    }
}

impl Deref for Assessed {
    type Target = Deduped;
    fn deref(&self) -> &Deduped {
        &self.image
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    image: Assessed,
    classification: Classification,
}

impl Classified {
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn slug(&self) -> &str {
        &self.classification.slug
    }

    pub fn organize(self, destinations: Vec<String>) -> Organized {
        Organized {
            image: self,
            destinations,
        }
    }
}

impl Deref for Classified {
    type Target = Assessed;
    fn deref(&self) -> &Assessed {
        &self.image
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Organized {
    image: Classified,
    destinations: Vec<String>,
}

impl Organized {
    /// Logical category folders, most specific first.
    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    pub fn render(self, derivatives: Derivatives) -> Rendered {
        Rendered {
            image: self,
            derivatives,
        }
    }
}

impl Deref for Organized {
    type Target = Classified;
    fn deref(&self) -> &Classified {
        &self.image
    }
}

/// One sized, encoded output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub size: String,
    pub encoding: Encoding,
    /// Relative to the output root, `/`-separated.
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Everything the renderer materialized (or found already present) for a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Derivatives {
    pub variants: Vec<Variant>,
    /// Copy of the untouched original, relative to the output root.
    pub original: Option<String>,
    /// `data:` URI of the tiny preview.
    pub blur_placeholder: Option<String>,
}

impl Derivatives {
    pub fn find(&self, size: &str, encoding: Encoding) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.size == size && v.encoding == encoding)
    }
}

/// Terminal state: the record as handed to the manifest aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    image: Organized,
    derivatives: Derivatives,
}

impl Rendered {
    pub fn derivatives(&self) -> &Derivatives {
        &self.derivatives
    }
}

impl Deref for Rendered {
    type Target = Organized;
    fn deref(&self) -> &Organized {
        &self.image
    }
}

/// Join a relative path with `/` regardless of platform.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
