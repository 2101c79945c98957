//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table, the user's file is merged on top, and the
//! result is deserialized and validated.
//!
//! ## Config File Location
//!
//! Place `config.toml` in the project root (the directory passed as `--root`):
//!
//! ```text
//! project/
//! ├── config.toml          # Overrides stock defaults
//! ├── raw/
//! │   ├── website/         # Crawled images (origin = website)
//! │   └── local/           # Hand-copied images (origin = local)
//! └── assets/              # Output root (derivatives, folders, metadata)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Tables merge key by key; arrays replace the stock
//! value wholesale, so a tenant that supplies `[[rules.locations]]` gets only
//! its own locations:
//!
//! ```toml
//! [defaults]
//! location = "goa"
//!
//! [[rules.locations]]
//! name = "goa"
//! keywords = ["goa", "beach wedding"]
//! ```
//!
//! Run `photo-pipeline gen-config` for the full documented file. Unknown keys
//! are rejected to catch typos early.

use crate::classify::ColorName;
use crate::types::Origin;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `config.toml`.
///
/// All fields have defaults matching the stock destination-wedding dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Optional JSON feed written by the crawl collaborator. When set, it
    /// replaces directory enumeration of `sources`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<String>,
    /// Source trees, enumerated in the order listed.
    pub sources: Vec<SourceConfig>,
    pub output: OutputConfig,
    pub images: ImagesConfig,
    pub classification: ClassificationConfig,
    pub rules: RulesConfig,
    pub defaults: DefaultsConfig,
    pub organize: OrganizeConfig,
    pub landing: LandingConfig,
    pub processing: ProcessingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed: None,
            sources: vec![
                SourceConfig {
                    path: "raw/website".into(),
                    origin: Origin::Website,
                },
                SourceConfig {
                    path: "raw/local".into(),
                    origin: Origin::Local,
                },
            ],
            output: OutputConfig::default(),
            images: ImagesConfig::default(),
            classification: ClassificationConfig::default(),
            rules: RulesConfig::default(),
            defaults: DefaultsConfig::default(),
            organize: OrganizeConfig::default(),
            landing: LandingConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges and that
    /// cross-references (landing size names) resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_quality("images.webp_quality", self.images.webp_quality)?;
        check_quality("images.avif_quality", self.images.avif_quality)?;
        check_quality("images.preview.quality", self.images.preview.quality)?;
        if !(1..=10).contains(&self.images.avif_speed) {
            return Err(ConfigError::Validation(
                "images.avif_speed must be 1-10".into(),
            ));
        }
        if self.images.sizes.is_empty() {
            return Err(ConfigError::Validation(
                "images.sizes must not be empty".into(),
            ));
        }
        let mut names = HashSet::new();
        for size in &self.images.sizes {
            if size.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "images.sizes entries need a name".into(),
                ));
            }
            if !names.insert(size.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "images.sizes has duplicate name '{}'",
                    size.name
                )));
            }
            if size.width == 0 || size.height == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "images.sizes '{}' dimensions must be non-zero",
                    size.name
                )));
            }
        }
        if self.images.preview.width == 0 || self.images.preview.height == 0 {
            return Err(ConfigError::Validation(
                "images.preview dimensions must be non-zero".into(),
            ));
        }
        for (key, name) in [
            ("landing.hero_size", &self.landing.hero_size),
            ("landing.gallery_size", &self.landing.gallery_size),
        ] {
            if !names.contains(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{key} '{name}' is not one of images.sizes"
                )));
            }
        }
        if self.classification.alt_text_max_chars == 0 || self.classification.title_max_chars == 0
        {
            return Err(ConfigError::Validation(
                "classification character limits must be non-zero".into(),
            ));
        }
        if self.classification.palette_sample == 0 {
            return Err(ConfigError::Validation(
                "classification.palette_sample must be non-zero".into(),
            ));
        }
        for (key, value) in [
            ("defaults.location", &self.defaults.location),
            ("defaults.venue_type", &self.defaults.venue_type),
            ("defaults.event_type", &self.defaults.event_type),
            ("output.root", &self.output.root),
            ("output.derivatives_dir", &self.output.derivatives_dir),
            ("output.metadata_dir", &self.output.metadata_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        for (table, rules) in self.rules.tables() {
            for (i, rule) in rules.iter().enumerate() {
                if rule.name.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "rules.{table}[{i}] needs a name"
                    )));
                }
                if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err(ConfigError::Validation(format!(
                        "rules.{table} '{}' has no keywords",
                        rule.name
                    )));
                }
            }
        }
        for ce in &self.rules.color_elements {
            if ColorName::parse(&ce.color).is_none() {
                return Err(ConfigError::Validation(format!(
                    "rules.color_elements color '{}' is not a known color bin",
                    ce.color
                )));
            }
        }
        Ok(())
    }
}

fn check_quality(key: &str, value: u32) -> Result<(), ConfigError> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must be 1-100")))
    }
}

/// One source tree and the origin tag applied to every image under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory, relative to the project root unless absolute.
    pub path: String,
    pub origin: Origin,
}

/// Output layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Root of everything the pipeline writes.
    pub root: String,
    /// Derivative tree under `root`.
    pub derivatives_dir: String,
    /// JSON documents under `root`.
    pub metadata_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "assets".into(),
            derivatives_dir: "website-ready".into(),
            metadata_dir: "metadata".into(),
        }
    }
}

/// Derivative rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// WebP encoding quality (1 = worst, 100 = best).
    pub webp_quality: u32,
    /// AVIF encoding quality (1 = worst, 100 = best).
    pub avif_quality: u32,
    /// rav1e speed preset (1 = slowest/best, 10 = fastest).
    pub avif_speed: u8,
    /// Size catalog. Each entry is rendered in every encoding.
    pub sizes: Vec<SizeSpec>,
    /// Inline blur placeholder.
    pub preview: PreviewConfig,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            webp_quality: 85,
            avif_quality: 80,
            avif_speed: 6,
            sizes: vec![
                SizeSpec::boxed("hero", 1920, 1080),
                SizeSpec::width_only("large", 1400),
                SizeSpec::boxed("card", 800, 600),
                SizeSpec::boxed("thumbnail", 400, 300),
                SizeSpec::boxed("og", 1200, 630),
            ],
            preview: PreviewConfig::default(),
        }
    }
}

/// A named derivative size.
///
/// With both dimensions the output is center-cropped to the box; with only
/// a width the aspect ratio is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeSpec {
    pub name: String,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SizeSpec {
    pub fn boxed(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height: Some(height),
        }
    }

    pub fn width_only(name: &str, width: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            quality: 20,
        }
    }
}

/// Text generation limits and palette sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Alt text is cut to this many characters.
    pub alt_text_max_chars: usize,
    /// Title (alt-texts document) is the description cut to this many characters.
    pub title_max_chars: usize,
    /// Sample a palette and derive named dominant colors.
    pub dominant_colors: bool,
    /// Palette sample is the image shrunk to fit this square.
    pub palette_sample: u32,
    /// Samples with more distinct colors than this yield no dominant colors.
    pub palette_max_colors: usize,
    /// Most frequent colors kept.
    pub palette_top: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            alt_text_max_chars: 125,
            title_max_chars: 100,
            dominant_colors: true,
            palette_sample: 100,
            palette_max_colors: 1000,
            palette_top: 5,
        }
    }
}

/// A named category and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub name: String,
    pub keywords: Vec<String>,
}

impl RuleSet {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Maps a named dominant color to a descriptive element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorElement {
    pub color: String,
    pub element: String,
}

/// Ordered keyword tables. Order is significant: first match wins for
/// locations, events, services and venues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub locations: Vec<RuleSet>,
    pub events: Vec<RuleSet>,
    pub services: Vec<RuleSet>,
    /// Every matching subject is kept.
    pub subjects: Vec<RuleSet>,
    pub venues: Vec<RuleSet>,
    /// Every matching element is kept.
    pub elements: Vec<RuleSet>,
    pub color_elements: Vec<ColorElement>,
}

impl RulesConfig {
    /// All keyword tables with their config key, for validation.
    pub fn tables(&self) -> [(&'static str, &[RuleSet]); 6] {
        [
            ("locations", self.locations.as_slice()),
            ("events", self.events.as_slice()),
            ("services", self.services.as_slice()),
            ("subjects", self.subjects.as_slice()),
            ("venues", self.venues.as_slice()),
            ("elements", self.elements.as_slice()),
        ]
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            locations: vec![
                RuleSet::new(
                    "udaipur",
                    &[
                        "udaipur",
                        "lake pichola",
                        "city palace",
                        "oberoi udaivilas",
                        "taj lake palace",
                        "leela palace udaipur",
                        "jagmandir",
                        "fateh prakash",
                        "lake",
                        "aravalli",
                    ],
                ),
                RuleSet::new(
                    "jaipur",
                    &[
                        "jaipur",
                        "amer fort",
                        "city palace jaipur",
                        "rambagh",
                        "jai mahal",
                        "samode",
                        "fairmont jaipur",
                        "pink city",
                    ],
                ),
                RuleSet::new(
                    "goa",
                    &[
                        "goa",
                        "beach wedding",
                        "w goa",
                        "leela goa",
                        "taj exotica",
                        "panjim",
                        "candolim",
                        "tropical",
                        "palm",
                    ],
                ),
                RuleSet::new(
                    "kerala",
                    &[
                        "kerala",
                        "backwaters",
                        "kumarakom",
                        "alleppey",
                        "munnar",
                        "kochi",
                        "kovalam",
                        "coconut",
                    ],
                ),
                RuleSet::new(
                    "jodhpur",
                    &[
                        "jodhpur",
                        "umaid bhawan",
                        "mehrangarh",
                        "blue city",
                        "ajit bhawan",
                    ],
                ),
                RuleSet::new(
                    "jim-corbett",
                    &[
                        "jim corbett",
                        "corbett",
                        "forest wedding",
                        "jungle",
                        "uttarakhand",
                        "safari",
                    ],
                ),
            ],
            events: vec![
                RuleSet::new("mehendi", &["mehendi", "mehndi", "henna"]),
                RuleSet::new("sangeet", &["sangeet", "dance", "performance", "stage", "dj"]),
                RuleSet::new("haldi", &["haldi", "turmeric", "yellow ceremony"]),
                RuleSet::new(
                    "wedding-ceremony",
                    &[
                        "wedding", "phera", "mandap", "varmala", "jaimala", "ceremony", "vows",
                        "garland",
                    ],
                ),
                RuleSet::new(
                    "reception",
                    &["reception", "party", "dinner", "cocktail", "cake"],
                ),
                RuleSet::new("baraat", &["baraat", "groom entry", "horse", "band"]),
            ],
            services: vec![
                RuleSet::new(
                    "decor",
                    &[
                        "decor",
                        "decoration",
                        "flowers",
                        "floral",
                        "mandap",
                        "stage",
                        "lighting",
                        "candles",
                        "drapes",
                    ],
                ),
                RuleSet::new(
                    "catering",
                    &[
                        "catering", "food", "cuisine", "buffet", "dining", "menu", "thali",
                    ],
                ),
                RuleSet::new(
                    "entertainment",
                    &[
                        "entertainment",
                        "dj",
                        "band",
                        "dancer",
                        "fireworks",
                        "performance",
                    ],
                ),
                RuleSet::new(
                    "photography-videography",
                    &[
                        "photography",
                        "photographer",
                        "videography",
                        "drone",
                        "camera",
                    ],
                ),
                RuleSet::new(
                    "makeup-styling",
                    &[
                        "makeup",
                        "bridal makeup",
                        "styling",
                        "hair",
                        "beauty",
                        "lehenga",
                        "sherwani",
                    ],
                ),
            ],
            subjects: vec![
                RuleSet::new("couple-portrait", &["couple", "bride and groom", "together"]),
                RuleSet::new("bridal", &["bride", "bridal", "dulhan"]),
                RuleSet::new("groom", &["groom", "dulha", "sherwani"]),
                RuleSet::new("family", &["family", "parents", "relatives"]),
                RuleSet::new("guests", &["guests", "crowd", "gathering"]),
                RuleSet::new("venue", &["venue", "resort", "hotel", "fort", "beach"]),
                RuleSet::new(
                    "details",
                    &["rings", "jewelry", "invitation", "shoes", "details"],
                ),
            ],
            venues: vec![
                RuleSet::new("palace", &["palace", "mahal", "haveli"]),
                RuleSet::new("beach", &["beach", "sea", "ocean"]),
                RuleSet::new("fort", &["fort", "qila"]),
                RuleSet::new("resort", &["resort", "hotel"]),
            ],
            elements: vec![
                RuleSet::new("mandap", &["mandap", "decor"]),
                RuleSet::new("flowers", &["flower", "floral"]),
                RuleSet::new("lighting", &["light"]),
            ],
            color_elements: vec![
                ColorElement {
                    color: "red".into(),
                    element: "traditional-red".into(),
                },
                ColorElement {
                    color: "gold".into(),
                    element: "gold-accents".into(),
                },
            ],
        }
    }
}

/// Fallbacks for axes no rule matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub location: String,
    pub venue_type: String,
    /// Event type used when no event rule matches. Records with this event
    /// type are not filed under `by-event/`.
    pub event_type: String,
    /// Elements used when no element rule or color matches.
    pub elements: Vec<String>,
    /// Primary category when neither an event nor a service matched.
    pub primary_category: String,
    /// Secondary category when no subject matched.
    pub secondary_category: String,
    /// Description when no descriptive part could be built.
    pub description: String,
    /// Alt text when no descriptive part could be built.
    pub alt_text: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location: "udaipur".into(),
            venue_type: "palace".into(),
            event_type: "wedding".into(),
            elements: vec!["elegant-decor".into()],
            primary_category: "venue".into(),
            secondary_category: "general".into(),
            description: "Beautiful wedding moment".into(),
            alt_text: "Luxury destination wedding".into(),
        }
    }
}

/// Organization planner decision table inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizeConfig {
    /// Minimum quality score for the `heroes` subfolder (also needs hero-banner usage).
    pub hero_min_quality: u8,
    /// Subject that routes to the `venues` subfolder.
    pub venue_subject: String,
    /// Subjects that route to the `couples` subfolder.
    pub couple_subjects: Vec<String>,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            hero_min_quality: 8,
            venue_subject: "venue".into(),
            couple_subjects: vec!["couple-portrait".into(), "bridal".into()],
        }
    }
}

/// Per-location landing page data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LandingConfig {
    pub max_heroes: usize,
    pub max_gallery: usize,
    /// Appended to the location name to form the landing slug.
    pub slug_suffix: String,
    /// Size used for hero entries.
    pub hero_size: String,
    /// Size used for gallery entries.
    pub gallery_size: String,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            max_heroes: 5,
            max_gallery: 20,
            slug_suffix: "-destination-wedding".into(),
            hero_size: "hero".into(),
            gallery_size: "card".into(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers per phase.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values, arrays included, replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the project root.
pub fn load_config(root: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command. Parses back to
/// [`PipelineConfig::default`].
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Pipeline Configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Tables merge key by key with these defaults; arrays (sources, sizes,
# rule tables) replace the stock array entirely.
# Unknown keys will cause an error.

# Optional JSON feed from the crawl collaborator:
#   [{ "path": "raw/website/a.jpg", "origin": "website", "context": "alt text" }]
# When set, the feed replaces directory enumeration of [[sources]].
# feed = "raw/feed.json"

# ---------------------------------------------------------------------------
# Source trees, enumerated in this order. Order is the dedup tie-break:
# the first file seen wins, later look-alikes are reported as duplicates.
# ---------------------------------------------------------------------------
[[sources]]
path = "raw/website"
origin = "website"

[[sources]]
path = "raw/local"
origin = "local"

# ---------------------------------------------------------------------------
# Output layout (relative to the project root)
# ---------------------------------------------------------------------------
[output]
root = "assets"
# Derivatives: <root>/<derivatives_dir>/<encoding>/<size>s/<slug>.<ext>
derivatives_dir = "website-ready"
# JSON documents: manifest, alt-texts, landing-page-data, reports
metadata_dir = "metadata"

# ---------------------------------------------------------------------------
# Derivative rendering
# ---------------------------------------------------------------------------
[images]
webp_quality = 85
avif_quality = 80
# rav1e speed preset, 1 (slow, small) to 10 (fast, large).
avif_speed = 6

# Size catalog. With both width and height the output is center-cropped
# to the box; with width only the aspect ratio is kept. Sources are never
# upscaled.
[[images.sizes]]
name = "hero"
width = 1920
height = 1080

[[images.sizes]]
name = "large"
width = 1400

[[images.sizes]]
name = "card"
width = 800
height = 600

[[images.sizes]]
name = "thumbnail"
width = 400
height = 300

[[images.sizes]]
name = "og"
width = 1200
height = 630

# Inline blur placeholder, stored as a base64 WebP data URI.
[images.preview]
width = 20
height = 20
quality = 20

# ---------------------------------------------------------------------------
# Classification text and palette
# ---------------------------------------------------------------------------
[classification]
alt_text_max_chars = 125
title_max_chars = 100
dominant_colors = true
# The palette is sampled from the image shrunk to fit this square.
palette_sample = 100
# Samples with more distinct colors than this yield no dominant colors.
palette_max_colors = 1000
palette_top = 5

# ---------------------------------------------------------------------------
# Fallbacks for axes no rule matched
# ---------------------------------------------------------------------------
[defaults]
location = "udaipur"
venue_type = "palace"
event_type = "wedding"
elements = ["elegant-decor"]
primary_category = "venue"
secondary_category = "general"
description = "Beautiful wedding moment"
alt_text = "Luxury destination wedding"

# ---------------------------------------------------------------------------
# Organization: by-location/<location>/<heroes|venues|couples|gallery>
# ---------------------------------------------------------------------------
[organize]
hero_min_quality = 8
venue_subject = "venue"
couple_subjects = ["couple-portrait", "bridal"]

# ---------------------------------------------------------------------------
# Landing page data per location
# ---------------------------------------------------------------------------
[landing]
max_heroes = 5
max_gallery = 20
slug_suffix = "-destination-wedding"
hero_size = "hero"
gallery_size = "card"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers per phase.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Keyword rules. Matching is a case-insensitive substring search over the
# image path (relative to its source tree) plus any context text.
# Tables are ordered: the first matching location, event, service and venue
# wins. Every matching subject and element is kept.
# ---------------------------------------------------------------------------
[[rules.locations]]
name = "udaipur"
keywords = ["udaipur", "lake pichola", "city palace", "oberoi udaivilas", "taj lake palace", "leela palace udaipur", "jagmandir", "fateh prakash", "lake", "aravalli"]

[[rules.locations]]
name = "jaipur"
keywords = ["jaipur", "amer fort", "city palace jaipur", "rambagh", "jai mahal", "samode", "fairmont jaipur", "pink city"]

[[rules.locations]]
name = "goa"
keywords = ["goa", "beach wedding", "w goa", "leela goa", "taj exotica", "panjim", "candolim", "tropical", "palm"]

[[rules.locations]]
name = "kerala"
keywords = ["kerala", "backwaters", "kumarakom", "alleppey", "munnar", "kochi", "kovalam", "coconut"]

[[rules.locations]]
name = "jodhpur"
keywords = ["jodhpur", "umaid bhawan", "mehrangarh", "blue city", "ajit bhawan"]

[[rules.locations]]
name = "jim-corbett"
keywords = ["jim corbett", "corbett", "forest wedding", "jungle", "uttarakhand", "safari"]

[[rules.events]]
name = "mehendi"
keywords = ["mehendi", "mehndi", "henna"]

[[rules.events]]
name = "sangeet"
keywords = ["sangeet", "dance", "performance", "stage", "dj"]

[[rules.events]]
name = "haldi"
keywords = ["haldi", "turmeric", "yellow ceremony"]

[[rules.events]]
name = "wedding-ceremony"
keywords = ["wedding", "phera", "mandap", "varmala", "jaimala", "ceremony", "vows", "garland"]

[[rules.events]]
name = "reception"
keywords = ["reception", "party", "dinner", "cocktail", "cake"]

[[rules.events]]
name = "baraat"
keywords = ["baraat", "groom entry", "horse", "band"]

[[rules.services]]
name = "decor"
keywords = ["decor", "decoration", "flowers", "floral", "mandap", "stage", "lighting", "candles", "drapes"]

[[rules.services]]
name = "catering"
keywords = ["catering", "food", "cuisine", "buffet", "dining", "menu", "thali"]

[[rules.services]]
name = "entertainment"
keywords = ["entertainment", "dj", "band", "dancer", "fireworks", "performance"]

[[rules.services]]
name = "photography-videography"
keywords = ["photography", "photographer", "videography", "drone", "camera"]

[[rules.services]]
name = "makeup-styling"
keywords = ["makeup", "bridal makeup", "styling", "hair", "beauty", "lehenga", "sherwani"]

[[rules.subjects]]
name = "couple-portrait"
keywords = ["couple", "bride and groom", "together"]

[[rules.subjects]]
name = "bridal"
keywords = ["bride", "bridal", "dulhan"]

[[rules.subjects]]
name = "groom"
keywords = ["groom", "dulha", "sherwani"]

[[rules.subjects]]
name = "family"
keywords = ["family", "parents", "relatives"]

[[rules.subjects]]
name = "guests"
keywords = ["guests", "crowd", "gathering"]

[[rules.subjects]]
name = "venue"
keywords = ["venue", "resort", "hotel", "fort", "beach"]

[[rules.subjects]]
name = "details"
keywords = ["rings", "jewelry", "invitation", "shoes", "details"]

[[rules.venues]]
name = "palace"
keywords = ["palace", "mahal", "haveli"]

[[rules.venues]]
name = "beach"
keywords = ["beach", "sea", "ocean"]

[[rules.venues]]
name = "fort"
keywords = ["fort", "qila"]

[[rules.venues]]
name = "resort"
keywords = ["resort", "hotel"]

[[rules.elements]]
name = "mandap"
keywords = ["mandap", "decor"]

[[rules.elements]]
name = "flowers"
keywords = ["flower", "floral"]

[[rules.elements]]
name = "lighting"
keywords = ["light"]

# Named dominant colors (red, gold, white, black, pink, green, blue,
# neutral) that add a descriptive element.
[[rules.color_elements]]
color = "red"
element = "traditional-red"

[[rules.color_elements]]
color = "gold"
element = "gold-accents"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_size_catalog() {
        let config = PipelineConfig::default();
        let names: Vec<&str> = config.images.sizes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["hero", "large", "card", "thumbnail", "og"]);
        assert_eq!(config.images.sizes[1].height, None);
        assert_eq!(config.images.preview.width, 20);
    }

    #[test]
    fn default_config_has_ordered_sources() {
        let config = PipelineConfig::default();
        assert_eq!(config.sources[0].path, "raw/website");
        assert_eq!(config.sources[0].origin, Origin::Website);
        assert_eq!(config.sources[1].origin, Origin::Local);
    }

    #[test]
    fn default_rules_keep_declared_order() {
        let rules = RulesConfig::default();
        let locations: Vec<&str> = rules.locations.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            locations,
            vec!["udaipur", "jaipur", "goa", "kerala", "jodhpur", "jim-corbett"]
        );
        assert_eq!(rules.events[0].name, "mehendi");
        assert_eq!(rules.venues[0].name, "palace");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[images]
webp_quality = 70
"##;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.images.webp_quality, 70);
        // Defaults preserved
        assert_eq!(config.images.avif_quality, 80);
        assert_eq!(config.defaults.location, "udaipur");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r##"
[defaults]
location = "goa"

[landing]
max_heroes = 3
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.defaults.location, "goa");
        assert_eq!(config.landing.max_heroes, 3);
        // Sibling keys in merged tables survive
        assert_eq!(config.defaults.venue_type, "palace");
        assert_eq!(config.landing.max_gallery, 20);
    }

    #[test]
    fn load_config_rule_table_replaces_stock_table() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r##"
[[rules.locations]]
name = "lisbon"
keywords = ["lisbon", "alfama"]
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.rules.locations.len(), 1);
        assert_eq!(config.rules.locations[0].name, "lisbon");
        // Other tables untouched
        assert_eq!(config.rules.events.len(), 6);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r##"
[images]
webp_qualty = 80
"##,
        )
        .unwrap();

        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<PipelineConfig, _> = toml::from_str("[colors]\nbackground = 1\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_array_replaces() {
        let base: toml::Value = toml::from_str("xs = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("xs = [9]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["xs"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn merge_toml_nested_tables() {
        let base: toml::Value = toml::from_str("[t]\na = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\nb = 5\nc = 6").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["t"]["a"].as_integer(), Some(1));
        assert_eq!(merged["t"]["b"].as_integer(), Some(5));
        assert_eq!(merged["t"]["c"].as_integer(), Some(6));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_out_of_range() {
        let mut config = PipelineConfig::default();
        config.images.avif_quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.images.avif_quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_duplicate_size_names() {
        let mut config = PipelineConfig::default();
        config.images.sizes.push(SizeSpec::width_only("card", 640));
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate name 'card'"), "{err}");
    }

    #[test]
    fn validate_landing_size_must_exist() {
        let mut config = PipelineConfig::default();
        config.landing.hero_size = "banner".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("landing.hero_size"), "{err}");
    }

    #[test]
    fn validate_rule_without_keywords() {
        let mut config = PipelineConfig::default();
        config.rules.events.push(RuleSet::new("engagement", &[]));
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("engagement"), "{err}");
    }

    #[test]
    fn validate_unknown_color_bin() {
        let mut config = PipelineConfig::default();
        config.rules.color_elements.push(ColorElement {
            color: "mauve".into(),
            element: "mauve-drapes".into(),
        });
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mauve"), "{err}");
    }

    #[test]
    fn validate_zero_height_rejected() {
        let mut config = PipelineConfig::default();
        config.images.sizes[0].height = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[images]\navif_speed = 0\n",
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Processing / stock config
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 64),
        };
        assert_eq!(effective_threads(&config), cores);
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn stock_config_toml_matches_defaults() {
        let parsed: PipelineConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, PipelineConfig::default());
    }

    #[test]
    fn stock_defaults_value_roundtrips() {
        let config: PipelineConfig = stock_defaults_value().try_into().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
