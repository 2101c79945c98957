//! Source registry: the ordered list of candidate images.
//!
//! Two inputs, one output shape:
//!
//! - **Source trees** (default): every configured `sources` directory is
//!   walked in config order, entries sorted by file name, hidden entries
//!   skipped. A missing tree is not an error; crawls for one origin may
//!   simply not have run yet.
//! - **Feed file** (`feed = "..."`): a JSON array written by the crawl
//!   collaborator. When configured it replaces directory enumeration and its
//!   order is the registry order.
//!
//! ```json
//! [
//!   { "path": "raw/website/udaipur-palace-sangeet-001.jpg",
//!     "origin": "website",
//!     "context": "Sangeet night at the City Palace",
//!     "pageUrl": "https://example.com/udaipur-weddings" }
//! ]
//! ```
//!
//! Registry order matters downstream: it is the dedup tie-break and the
//! landing-page selection order.
//!
//! Context text comes from the feed entry (`context` and `pageUrl`) or from a
//! sidecar `<image>.txt` next to the file.

use crate::config::{PipelineConfig, SourceConfig};
use crate::imaging::supported_input_extensions;
use crate::record::{Discovered, slash_path};
use crate::types::{ErrorKind, ItemError, Origin, Phase};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Feed parse error: {0}")]
    Feed(#[from] serde_json::Error),
}

/// One entry of the crawl collaborator's feed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedEntry {
    /// Relative to the project root, or absolute.
    pub path: String,
    pub origin: Origin,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Enumerated images plus the entries that could not be registered.
#[derive(Debug, Default)]
pub struct Registry {
    pub images: Vec<Discovered>,
    pub errors: Vec<ItemError>,
}

impl Registry {
    pub fn count_by_origin(&self) -> BTreeMap<Origin, usize> {
        count_by_origin(&self.images)
    }
}

/// Per-origin counts, with every origin present.
pub fn count_by_origin(images: &[Discovered]) -> BTreeMap<Origin, usize> {
    let mut counts = BTreeMap::from([(Origin::Website, 0), (Origin::Local, 0)]);
    for image in images {
        *counts.entry(image.origin).or_default() += 1;
    }
    counts
}

/// Build the registry for a project root.
///
/// Only an unreadable or malformed feed file is fatal. Individual missing or
/// unsupported files become [`ItemError`]s.
pub fn enumerate(root: &Path, config: &PipelineConfig) -> Result<Registry, RegistryError> {
    let registry = match &config.feed {
        Some(feed) => from_feed(root, &root.join(feed), &config.sources)?,
        None => walk_sources(root, &config.sources),
    };
    tracing::debug!(
        images = registry.images.len(),
        errors = registry.errors.len(),
        "registry enumerated"
    );
    Ok(registry)
}

fn walk_sources(root: &Path, sources: &[SourceConfig]) -> Registry {
    let mut registry = Registry::default();
    for source in sources {
        let dir = root.join(&source.path);
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "source tree missing, skipped");
            continue;
        }
        let walker = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| display_path(root, p))
                        .unwrap_or_else(|| display_path(root, &dir));
                    registry.errors.push(ItemError::new(
                        path,
                        Phase::Registry,
                        ErrorKind::Io,
                        e.to_string(),
                    ));
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !is_image(path) {
                continue;
            }
            let relative = path
                .strip_prefix(&dir)
                .map(slash_path)
                .unwrap_or_else(|_| path.display().to_string());
            registry.images.push(Discovered {
                path: path.to_path_buf(),
                source: display_path(root, path),
                relative,
                origin: source.origin,
                context: read_sidecar(path),
            });
        }
    }
    registry
}

fn from_feed(
    root: &Path,
    feed_path: &Path,
    sources: &[SourceConfig],
) -> Result<Registry, RegistryError> {
    let content = std::fs::read_to_string(feed_path)?;
    let entries: Vec<FeedEntry> = serde_json::from_str(&content)?;

    let mut registry = Registry::default();
    for entry in entries {
        let path = root.join(&entry.path);
        let source = display_path(root, &path);
        if !path.is_file() {
            registry.errors.push(ItemError::new(
                source,
                Phase::Registry,
                ErrorKind::Io,
                "file not found",
            ));
            continue;
        }
        if !is_image(&path) {
            registry.errors.push(ItemError::new(
                source,
                Phase::Registry,
                ErrorKind::Decode,
                "unsupported image format",
            ));
            continue;
        }
        let context = match (entry.context, entry.page_url) {
            (None, None) => read_sidecar(&path),
            (context, page_url) => Some(
                context
                    .into_iter()
                    .chain(page_url)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        };
        registry.images.push(Discovered {
            relative: relative_to_source(root, &path, sources),
            path,
            source,
            origin: entry.origin,
            context,
        });
    }
    Ok(registry)
}

/// Path relative to the configured source tree containing it, else to the root.
fn relative_to_source(root: &Path, path: &Path, sources: &[SourceConfig]) -> String {
    sources
        .iter()
        .find_map(|s| path.strip_prefix(root.join(&s.path)).ok())
        .or_else(|| path.strip_prefix(root).ok())
        .map(slash_path)
        .unwrap_or_else(|| path.display().to_string())
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(slash_path)
        .unwrap_or_else(|_| path.display().to_string())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// Read `<image>.txt` next to an image. Empty or whitespace-only files count
/// as absent.
pub fn read_sidecar(image_path: &Path) -> Option<String> {
    let sidecar: PathBuf = image_path.with_extension("txt");
    std::fs::read_to_string(sidecar)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
