//! Derivative renderer.
//!
//! For each decodable record, materializes the size catalog in every
//! encoding, an inline blur placeholder, and lossless copies of the original.
//!
//! ## Output Structure
//!
//! ```text
//! <output.root>/
//! ├── website-ready/                     # output.derivatives_dir
//! │   ├── .preview-cache.json
//! │   ├── webp/
//! │   │   ├── heros/<slug>.webp
//! │   │   ├── larges/<slug>.webp
//! │   │   └── ...                        # one `<size>s` dir per catalog entry
//! │   ├── avif/
//! │   │   └── heros/<slug>.avif ...
//! │   └── original/<slug>.<ext>
//! └── by-location/udaipur/gallery/<slug>.<ext>   # original, per destination
//! ```
//!
//! ## Idempotence
//!
//! A target that already exists is never regenerated or re-copied. The
//! backend is only called when at least one sized output is missing or the
//! blur placeholder is not in the [`PreviewCache`]. A second run over
//! unchanged sources therefore decodes nothing and writes nothing.
//!
//! ## Failures
//!
//! Each failed output is counted and reported as an [`ItemError`]; the rest
//! of the record and the batch carry on.

use crate::cache::{self, CacheStats, PreviewCache};
use crate::config::{PipelineConfig, SizeSpec};
use crate::imaging::{
    Dimensions, ImageBackend, PreviewParams, Quality, RenderParams, ResizeMode, VariantParams,
    plan_size,
};
use crate::pipeline::PipelineEvent;
use crate::record::{Derivatives, Organized, Rendered, Variant};
use crate::types::{Encoding, ErrorKind, ItemError, Phase};
use base64::{Engine as _, engine::general_purpose};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// What happened to one output of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    /// Already on disk from an earlier run.
    Existing,
    /// Blur placeholder served from the preview cache.
    Cached,
    Encoded,
    Copied,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    /// Display label, e.g. `hero.webp` or `original`.
    pub label: String,
    pub status: OutputStatus,
}

/// Per-encoding file counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingStats {
    pub created: u32,
    pub existing: u32,
    pub failed: u32,
    /// Bytes written this run.
    pub bytes: u64,
}

/// Aggregate render statistics for the run report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    /// Records that went through the renderer.
    pub images: u32,
    /// Records skipped because their source never decoded.
    pub undecodable: u32,
    pub encodings: BTreeMap<Encoding, EncodingStats>,
    /// Size of the sources of every rendered record.
    pub bytes_before: u64,
    /// Bytes of sized derivatives written this run.
    pub bytes_after: u64,
    pub originals_copied: u32,
    pub originals_existing: u32,
    /// Outputs that failed (encode or I/O).
    pub failures: u32,
    pub previews: CacheStats,
}

impl RenderStats {
    fn merge(&mut self, other: &RenderStats) {
        self.images += other.images;
        self.undecodable += other.undecodable;
        for (encoding, stats) in &other.encodings {
            let mine = self.encodings.entry(*encoding).or_default();
            mine.created += stats.created;
            mine.existing += stats.existing;
            mine.failed += stats.failed;
            mine.bytes += stats.bytes;
        }
        self.bytes_before += other.bytes_before;
        self.bytes_after += other.bytes_after;
        self.originals_copied += other.originals_copied;
        self.originals_existing += other.originals_existing;
        self.failures += other.failures;
        self.previews.hits += other.previews.hits;
        self.previews.misses += other.previews.misses;
    }

    fn encoding(&mut self, encoding: Encoding) -> &mut EncodingStats {
        self.encodings.entry(encoding).or_default()
    }

    /// Files created this run across all encodings.
    pub fn created(&self) -> u32 {
        self.encodings.values().map(|s| s.created).sum()
    }

    /// Files left in place across all encodings.
    pub fn existing(&self) -> u32 {
        self.encodings.values().map(|s| s.existing).sum()
    }
}

impl fmt::Display for RenderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images: {} created, {} existing, {} failed; previews {}",
            self.images,
            self.created(),
            self.existing(),
            self.failures,
            self.previews
        )
    }
}

/// Output locations and encoder settings, resolved once per run.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    output_root: PathBuf,
    derivatives_dir: String,
    sizes: Vec<SizeSpec>,
    webp_quality: Quality,
    avif_quality: Quality,
    avif_speed: u8,
    preview: PreviewParams,
    preview_hash: String,
}

impl RenderPlan {
    pub fn new(root: &Path, config: &PipelineConfig) -> Self {
        let preview = &config.images.preview;
        Self {
            output_root: root.join(&config.output.root),
            derivatives_dir: config.output.derivatives_dir.clone(),
            sizes: config.images.sizes.clone(),
            webp_quality: Quality::new(config.images.webp_quality),
            avif_quality: Quality::new(config.images.avif_quality),
            avif_speed: config.images.avif_speed,
            preview: PreviewParams {
                width: preview.width,
                height: preview.height,
                quality: Quality::new(preview.quality),
            },
            preview_hash: cache::hash_preview_params(
                preview.width,
                preview.height,
                preview.quality,
            ),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn derivatives_path(&self) -> PathBuf {
        self.output_root.join(&self.derivatives_dir)
    }

    /// `<derivatives_dir>/<encoding>/<size>s/<slug>.<ext>`, relative to the output root.
    pub fn variant_path(&self, size: &str, encoding: Encoding, slug: &str) -> String {
        format!(
            "{}/{}/{}s/{}.{}",
            self.derivatives_dir,
            encoding.extension(),
            size,
            slug,
            encoding.extension()
        )
    }

    /// `<derivatives_dir>/original/<slug>.<ext>`, relative to the output root.
    pub fn original_path(&self, slug: &str, extension: &str) -> String {
        format!("{}/original/{}.{}", self.derivatives_dir, slug, extension)
    }

    /// Every sized output for a source, catalog order then encoding order.
    pub fn planned_variants(&self, source: Dimensions, slug: &str) -> Vec<(Variant, ResizeMode)> {
        let mut planned = Vec::with_capacity(self.sizes.len() * Encoding::ALL.len());
        for size in &self.sizes {
            let (dims, mode) = plan_size(source, size);
            for encoding in Encoding::ALL {
                planned.push((
                    Variant {
                        size: size.name.clone(),
                        encoding,
                        path: self.variant_path(&size.name, encoding, slug),
                        width: dims.width,
                        height: dims.height,
                    },
                    mode,
                ));
            }
        }
        planned
    }

    fn quality(&self, encoding: Encoding) -> Quality {
        match encoding {
            Encoding::Webp => self.webp_quality,
            Encoding::Avif => self.avif_quality,
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderOutcome {
    pub records: Vec<Rendered>,
    pub stats: RenderStats,
    pub errors: Vec<ItemError>,
}

/// Result of rendering one record, before merging.
struct RecordResult {
    record: Rendered,
    stats: RenderStats,
    errors: Vec<ItemError>,
    /// `(source_hash, data_uri)` of a freshly encoded preview.
    new_preview: Option<(String, String)>,
    /// Cache key this record used or produced.
    preview_key: Option<String>,
}

/// Render every record in parallel, then update the preview cache.
///
/// Each record's outputs are produced by one task, and slugs are unique, so
/// no two workers ever write the same path.
pub fn render_all(
    records: Vec<Organized>,
    plan: &RenderPlan,
    backend: &impl ImageBackend,
    events: Option<&Sender<PipelineEvent>>,
) -> RenderOutcome {
    let derivatives = plan.derivatives_path();
    let mut cache = PreviewCache::load(&derivatives);

    let results: Vec<RecordResult> = records
        .into_par_iter()
        .enumerate()
        .map(|(i, record)| {
            let (result, outputs) = render_record(record, plan, backend, &cache);
            if let Some(tx) = events {
                tx.send(PipelineEvent::ImageRendered {
                    index: i + 1,
                    slug: result.record.slug().to_string(),
                    source: result.record.source.clone(),
                    outputs,
                })
                .ok();
            }
            result
        })
        .collect();

    let mut outcome = RenderOutcome::default();
    let mut live = HashSet::new();
    for result in results {
        if let Some((source_hash, data_uri)) = result.new_preview {
            cache.insert(&source_hash, &plan.preview_hash, data_uri);
        }
        live.extend(result.preview_key);
        outcome.stats.merge(&result.stats);
        outcome.errors.extend(result.errors);
        outcome.records.push(result.record);
    }

    cache.prune(&live);
    if let Err(e) = cache.save(&derivatives) {
        tracing::warn!(error = %e, "could not save preview cache");
        outcome.errors.push(ItemError::new(
            cache::cache_path(&derivatives).display().to_string(),
            Phase::Render,
            ErrorKind::Io,
            e.to_string(),
        ));
    }
    tracing::debug!(stats = %outcome.stats, "render finished");
    outcome
}

fn render_record(
    record: Organized,
    plan: &RenderPlan,
    backend: &impl ImageBackend,
    cache: &PreviewCache,
) -> (RecordResult, Vec<OutputInfo>) {
    let mut stats = RenderStats::default();
    let mut errors = Vec::new();
    let mut outputs = Vec::new();

    let Some(source_dims) = record.assessment().dimensions else {
        stats.undecodable = 1;
        let result = RecordResult {
            record: record.render(Derivatives::default()),
            stats,
            errors,
            new_preview: None,
            preview_key: None,
        };
        return (result, outputs);
    };
    stats.images = 1;
    stats.bytes_before = std::fs::metadata(&record.path).map(|m| m.len()).unwrap_or(0);

    let slug = record.slug().to_string();
    let mut derivatives = Derivatives::default();
    let mut missing: Vec<(Variant, VariantParams)> = Vec::new();

    for (variant, mode) in plan.planned_variants(source_dims, &slug) {
        let target = plan.output_root.join(&variant.path);
        if target.exists() {
            stats.encoding(variant.encoding).existing += 1;
            outputs.push(OutputInfo {
                label: label(&variant),
                status: OutputStatus::Existing,
            });
            derivatives.variants.push(variant);
            continue;
        }
        if let Some(parent) = target.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            stats.encoding(variant.encoding).failed += 1;
            stats.failures += 1;
            errors.push(ItemError::new(&record.source, Phase::Render, ErrorKind::Io, e.to_string()));
            outputs.push(OutputInfo {
                label: label(&variant),
                status: OutputStatus::Failed,
            });
            continue;
        }
        let params = VariantParams {
            output: target,
            width: variant.width,
            height: variant.height,
            mode,
            encoding: variant.encoding,
            quality: plan.quality(variant.encoding),
            speed: plan.avif_speed,
        };
        missing.push((variant, params));
    }

    // Blur placeholder: cache first, else encode alongside the missing variants.
    let source_hash = match cache::hash_file(&record.path) {
        Ok(hash) => Some(hash),
        Err(e) => {
            errors.push(ItemError::new(&record.source, Phase::Render, ErrorKind::Io, e.to_string()));
            None
        }
    };
    let preview_key = source_hash
        .as_deref()
        .map(|h| cache::content_key(h, &plan.preview_hash));
    let cached = source_hash
        .as_deref()
        .and_then(|h| cache.get(h, &plan.preview_hash));
    let mut new_preview = None;
    match cached {
        Some(data_uri) => {
            stats.previews.hit();
            derivatives.blur_placeholder = Some(data_uri.to_string());
            outputs.push(OutputInfo {
                label: "blur".into(),
                status: OutputStatus::Cached,
            });
        }
        None => stats.previews.miss(),
    }

    if !missing.is_empty() || cached.is_none() {
        let (variants, params): (Vec<Variant>, Vec<VariantParams>) = missing.into_iter().unzip();
        let request = RenderParams {
            source: record.path.clone(),
            variants: params,
            preview: cached.is_none().then_some(plan.preview),
        };
        match backend.render(&request) {
            Ok(rendered) => {
                for (variant, result) in variants.into_iter().zip(rendered.variants) {
                    match result {
                        Ok(bytes) => {
                            let enc = stats.encoding(variant.encoding);
                            enc.created += 1;
                            enc.bytes += bytes;
                            stats.bytes_after += bytes;
                            outputs.push(OutputInfo {
                                label: label(&variant),
                                status: OutputStatus::Encoded,
                            });
                            derivatives.variants.push(variant);
                        }
                        Err(e) => {
                            tracing::warn!(output = %variant.path, error = %e, "encode failed");
                            stats.encoding(variant.encoding).failed += 1;
                            stats.failures += 1;
                            errors.push(ItemError::new(
                                &record.source,
                                Phase::Render,
                                ErrorKind::Encode,
                                format!("{}: {}", variant.path, e),
                            ));
                            outputs.push(OutputInfo {
                                label: label(&variant),
                                status: OutputStatus::Failed,
                            });
                        }
                    }
                }
                match rendered.preview {
                    Some(Ok(bytes)) => {
                        let data_uri = format!(
                            "data:image/webp;base64,{}",
                            general_purpose::STANDARD.encode(bytes)
                        );
                        derivatives.blur_placeholder = Some(data_uri.clone());
                        new_preview = source_hash.clone().map(|h| (h, data_uri));
                        outputs.push(OutputInfo {
                            label: "blur".into(),
                            status: OutputStatus::Encoded,
                        });
                    }
                    Some(Err(e)) => {
                        stats.failures += 1;
                        errors.push(ItemError::new(
                            &record.source,
                            Phase::Render,
                            ErrorKind::Encode,
                            format!("blur placeholder: {e}"),
                        ));
                    }
                    None => {}
                }
            }
            Err(e) => {
                tracing::warn!(source = %record.source, error = %e, "render failed");
                for variant in &variants {
                    stats.encoding(variant.encoding).failed += 1;
                    stats.failures += 1;
                    outputs.push(OutputInfo {
                        label: label(variant),
                        status: OutputStatus::Failed,
                    });
                }
                errors.push(ItemError::new(
                    &record.source,
                    Phase::Render,
                    ErrorKind::Decode,
                    e.to_string(),
                ));
            }
        }
    }
    // Catalog order regardless of which variants were already present.
    let order = |v: &Variant| {
        let size = plan.sizes.iter().position(|s| s.name == v.size);
        (size, v.encoding)
    };
    derivatives.variants.sort_by_key(order);

    // Lossless copies: the canonical original plus one per destination folder.
    let extension = record.extension();
    let original = plan.original_path(&slug, &extension);
    let copies = std::iter::once(original.clone()).chain(
        record
            .destinations()
            .iter()
            .map(|dest| format!("{dest}/{slug}.{extension}")),
    );
    let mut original_ok = false;
    for (i, relative) in copies.enumerate() {
        let label = if i == 0 { "original".to_string() } else { relative.clone() };
        match copy_original(&record.path, &plan.output_root.join(&relative)) {
            Ok(status) => {
                if status == OutputStatus::Copied {
                    stats.originals_copied += 1;
                } else {
                    stats.originals_existing += 1;
                }
                original_ok |= i == 0;
                outputs.push(OutputInfo { label, status });
            }
            Err(e) => {
                stats.failures += 1;
                errors.push(ItemError::new(
                    &record.source,
                    Phase::Render,
                    ErrorKind::Io,
                    format!("{relative}: {e}"),
                ));
                outputs.push(OutputInfo {
                    label,
                    status: OutputStatus::Failed,
                });
            }
        }
    }
    if original_ok {
        derivatives.original = Some(original);
    }

    let result = RecordResult {
        record: record.render(derivatives),
        stats,
        errors,
        new_preview,
        preview_key,
    };
    (result, outputs)
}

fn label(variant: &Variant) -> String {
    format!("{}.{}", variant.size, variant.encoding)
}

/// Copy `source` to `target` unless it already exists. Writes through a
/// `.part` file so a partial copy never sits at the final path.
fn copy_original(source: &Path, target: &Path) -> std::io::Result<OutputStatus> {
    if target.exists() {
        return Ok(OutputStatus::Existing);
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    std::fs::copy(source, &part)?;
    std::fs::rename(&part, target)?;
    Ok(OutputStatus::Copied)
}
