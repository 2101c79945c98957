//! Manifest aggregator: rendered records → JSON documents.
//!
//! Every document is a pure projection of the in-memory record set; nothing
//! here reads back from disk. Documents are regenerated wholesale each run
//! and written pretty-printed under `<output.root>/<output.metadata_dir>/`:
//!
//! | File | Contents |
//! |---|---|
//! | `manifest.json` | every classified image with derivatives and tags |
//! | `alt-texts.json` | slug → alt, title, caption, keywords |
//! | `landing-page-data.json` | per-location hero and gallery selections |
//! | `duplicates-report.json` | every near-duplicate and its representative |
//! | `quality-report.json` | source paths bucketed by quality score |
//! | `discovery-report.json` | registry totals, duplicates, score distribution |
//! | `run-report.json` | per-item errors and render statistics |
//!
//! Keys are camelCase and maps are `BTreeMap`s, so two runs over the same
//! records differ only in `generatedAt`.

use crate::classify::Classification;
use crate::config::LandingConfig;
use crate::dedup::DuplicateRecord;
use crate::imaging::Dimensions;
use crate::record::Rendered;
use crate::registry;
use crate::render::RenderStats;
use crate::types::{Encoding, ItemError, Origin, UsageClass};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Document types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub generated_at: String,
    pub total_images: usize,
    pub source_counts: BTreeMap<Origin, usize>,
    pub images: Vec<ManifestImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestImage {
    pub id: String,
    pub original_source: String,
    pub origin: Origin,
    pub fingerprint: String,
    pub classification: Classification,
    pub derivative_paths: DerivativePaths,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur_placeholder: Option<String>,
    pub alt_text: String,
    pub destination_folders: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub quality_score: u8,
    pub usage_classes: Vec<UsageClass>,
}

/// `{ "original": ..., "webp": { "hero": ... }, "avif": { ... } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivativePaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(flatten)]
    pub encodings: BTreeMap<Encoding, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AltText {
    pub alt: String,
    pub title: String,
    pub caption: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandingPageData {
    pub locations: BTreeMap<String, LocationLanding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLanding {
    pub slug: String,
    pub hero_images: Vec<HeroImage>,
    pub gallery: Vec<GalleryImage>,
    pub stats: LocationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroImage {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur: Option<String>,
    pub alt: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryImage {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStats {
    pub total_images: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatesReport {
    pub exact_duplicates: Vec<DuplicateRecord>,
    pub total_duplicates: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityBuckets<T> {
    pub excellent: T,
    pub good: T,
    pub acceptable: T,
    pub low: T,
}

impl<T> QualityBuckets<T> {
    fn bucket_mut(&mut self, score: u8) -> &mut T {
        match score {
            9..=u8::MAX => &mut self.excellent,
            7..=8 => &mut self.good,
            5..=6 => &mut self.acceptable,
            _ => &mut self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub total_images: usize,
    pub by_quality: QualityBuckets<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub generated_at: String,
    /// Every file the registry enumerated, duplicates included.
    pub total_images: usize,
    pub sources: BTreeMap<Origin, usize>,
    pub duplicates_found: usize,
    pub quality_distribution: QualityBuckets<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated_at: String,
    pub total_errors: usize,
    pub errors: Vec<ItemError>,
    pub render: RenderStats,
}

/// Everything the aggregator needs from one run.
#[derive(Debug, Clone, Copy)]
pub struct RunData<'a> {
    pub generated_at: &'a str,
    /// Per-origin registry counts, before dedup.
    pub discovered: &'a BTreeMap<Origin, usize>,
    pub duplicates: &'a [DuplicateRecord],
    pub records: &'a [Rendered],
    pub errors: &'a [ItemError],
    pub stats: &'a RenderStats,
}

/// The full document set for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Documents {
    pub manifest: Manifest,
    pub alt_texts: BTreeMap<String, AltText>,
    pub landing: LandingPageData,
    pub duplicates: DuplicatesReport,
    pub quality: QualityReport,
    pub discovery: DiscoveryReport,
    pub run: RunReport,
}

impl Documents {
    /// Write every document into `dir`, returning the paths written.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(7);
        written.push(write_json(dir, "manifest.json", &self.manifest)?);
        written.push(write_json(dir, "alt-texts.json", &self.alt_texts)?);
        written.push(write_json(dir, "landing-page-data.json", &self.landing)?);
        written.push(write_json(dir, "duplicates-report.json", &self.duplicates)?);
        written.push(write_json(dir, "quality-report.json", &self.quality)?);
        written.push(write_json(dir, "discovery-report.json", &self.discovery)?);
        written.push(write_json(dir, "run-report.json", &self.run)?);
        Ok(written)
    }
}

fn write_json(dir: &Path, name: &str, document: &impl Serialize) -> Result<PathBuf, std::io::Error> {
    let path = dir.join(name);
    let mut json = serde_json::to_string_pretty(document)?;
    json.push('\n');
    std::fs::write(&path, json)?;
    Ok(path)
}

// ============================================================================
// Projections
// ============================================================================

/// Landing page selection settings plus the location list to report on.
#[derive(Debug, Clone)]
pub struct Aggregator {
    locations: Vec<String>,
    landing: LandingConfig,
}

impl Aggregator {
    /// `locations` is every landing key; see [`Classifier::locations`](crate::classify::Classifier::locations).
    pub fn new(locations: Vec<String>, landing: &LandingConfig) -> Self {
        Self {
            locations,
            landing: landing.clone(),
        }
    }

    pub fn aggregate(&self, run: &RunData<'_>) -> Documents {
        Documents {
            manifest: manifest(run.generated_at, run.records),
            alt_texts: alt_texts(run.records),
            landing: self.landing(run.records),
            duplicates: duplicates_report(run.duplicates),
            quality: quality_report(run.records),
            discovery: discovery_report(
                run.generated_at,
                run.discovered,
                run.duplicates.len(),
                run.records,
            ),
            run: run_report(run.generated_at, run.errors, run.stats),
        }
    }

    /// Per-location hero and gallery picks, registry order, capped.
    ///
    /// Heroes need the hero-banner usage class and a rendered hero variant.
    /// Gallery entries need a rendered gallery-size variant.
    pub fn landing(&self, records: &[Rendered]) -> LandingPageData {
        let cfg = &self.landing;
        let locations = self
            .locations
            .iter()
            .map(|location| {
                let here: Vec<&Rendered> = records
                    .iter()
                    .filter(|r| &r.classification().location == location)
                    .collect();

                let hero_images = here
                    .iter()
                    .filter(|r| r.assessment().has_usage(UsageClass::HeroBanner))
                    .filter_map(|r| {
                        let d = r.derivatives();
                        let hero = d.find(&cfg.hero_size, Encoding::Webp)?;
                        Some(HeroImage {
                            src: hero.path.clone(),
                            alt_format: d
                                .find(&cfg.hero_size, Encoding::Avif)
                                .map(|v| v.path.clone()),
                            blur: d.blur_placeholder.clone(),
                            alt: r.classification().alt_text.clone(),
                            width: hero.width,
                            height: hero.height,
                        })
                    })
                    .take(cfg.max_heroes)
                    .collect();

                let gallery = here
                    .iter()
                    .filter_map(|r| {
                        let card = r.derivatives().find(&cfg.gallery_size, Encoding::Webp)?;
                        Some(GalleryImage {
                            src: card.path.clone(),
                            alt: r.classification().alt_text.clone(),
                        })
                    })
                    .take(cfg.max_gallery)
                    .collect();

                let landing = LocationLanding {
                    slug: format!("{}{}", location, cfg.slug_suffix),
                    hero_images,
                    gallery,
                    stats: LocationStats {
                        total_images: here.len(),
                    },
                };
                (location.clone(), landing)
            })
            .collect();
        LandingPageData { locations }
    }
}

pub fn manifest(generated_at: &str, records: &[Rendered]) -> Manifest {
    let images: Vec<ManifestImage> = records.iter().map(manifest_image).collect();
    let mut source_counts = BTreeMap::from([(Origin::Website, 0), (Origin::Local, 0)]);
    for record in records {
        *source_counts.entry(record.origin).or_default() += 1;
    }
    Manifest {
        generated_at: generated_at.to_string(),
        total_images: images.len(),
        source_counts,
        images,
    }
}

fn manifest_image(record: &Rendered) -> ManifestImage {
    let classification = record.classification();
    let derivatives = record.derivatives();
    let mut paths = DerivativePaths {
        original: derivatives.original.clone(),
        ..Default::default()
    };
    for variant in &derivatives.variants {
        paths
            .encodings
            .entry(variant.encoding)
            .or_default()
            .insert(variant.size.clone(), variant.path.clone());
    }
    let assessment = record.assessment();
    ManifestImage {
        id: classification.slug.clone(),
        original_source: record.source.clone(),
        origin: record.origin,
        fingerprint: record.fingerprint().to_string(),
        classification: classification.clone(),
        derivative_paths: paths,
        blur_placeholder: derivatives.blur_placeholder.clone(),
        alt_text: classification.alt_text.clone(),
        destination_folders: record.destinations().to_vec(),
        tags: classification.tags(),
        dimensions: assessment.dimensions,
        quality_score: assessment.quality_score,
        usage_classes: assessment.usage.clone(),
    }
}

pub fn alt_texts(records: &[Rendered]) -> BTreeMap<String, AltText> {
    records
        .iter()
        .map(|record| {
            let c = record.classification();
            let mut keywords = vec![
                c.location.clone(),
                c.venue_type.clone(),
                c.event_type.clone(),
            ];
            keywords.extend(c.elements.iter().take(3).cloned());
            let entry = AltText {
                alt: c.alt_text.clone(),
                title: c.title.clone(),
                caption: c.description.clone(),
                keywords,
            };
            (c.slug.clone(), entry)
        })
        .collect()
}

pub fn duplicates_report(duplicates: &[DuplicateRecord]) -> DuplicatesReport {
    DuplicatesReport {
        exact_duplicates: duplicates.to_vec(),
        total_duplicates: duplicates.len(),
    }
}

pub fn quality_report(records: &[Rendered]) -> QualityReport {
    let mut by_quality = QualityBuckets::<Vec<String>>::default();
    for record in records {
        by_quality
            .bucket_mut(record.assessment().quality_score)
            .push(record.source.clone());
    }
    QualityReport {
        total_images: records.len(),
        by_quality,
    }
}

pub fn discovery_report(
    generated_at: &str,
    discovered: &BTreeMap<Origin, usize>,
    duplicates_found: usize,
    records: &[Rendered],
) -> DiscoveryReport {
    let mut quality_distribution = QualityBuckets::<usize>::default();
    for record in records {
        *quality_distribution.bucket_mut(record.assessment().quality_score) += 1;
    }
    let mut sources = registry::count_by_origin(&[]);
    sources.extend(discovered.iter().map(|(origin, n)| (*origin, *n)));
    DiscoveryReport {
        generated_at: generated_at.to_string(),
        total_images: discovered.values().sum(),
        sources,
        duplicates_found,
        quality_distribution,
    }
}

pub fn run_report(generated_at: &str, errors: &[ItemError], stats: &RenderStats) -> RunReport {
    RunReport {
        generated_at: generated_at.to_string(),
        total_errors: errors.len(),
        errors: errors.to_vec(),
        render: stats.clone(),
    }
}
