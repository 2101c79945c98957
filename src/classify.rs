//! Classification engine: ordered keyword rules over path and context text.
//!
//! The searched text is the image's path relative to its source tree plus
//! any context string, lower-cased. Each rule table is an ordered list of
//! `(name, keywords)` pairs and a rule matches when any keyword is a
//! substring of the text.
//!
//! | Axis | Table | Matching | Unmatched |
//! |---|---|---|---|
//! | location | `rules.locations` | first wins | `defaults.location` |
//! | event | `rules.events` | first wins | `defaults.event_type` |
//! | service | `rules.services` | first wins | none |
//! | venue type | `rules.venues` | first wins | `defaults.venue_type` |
//! | subjects | `rules.subjects` | all, in table order | empty |
//! | elements | `rules.elements` + color elements | all, in table order | `defaults.elements` |
//!
//! Descriptions, alt text and slugs are templated from the matched values,
//! so the same rules and text always give byte-identical output.

use crate::config::{ClassificationConfig, DefaultsConfig, PipelineConfig, RuleSet, RulesConfig};
use crate::imaging::{ImageBackend, PaletteParams};
use crate::naming::{
    SlugAllocator, disambiguator, humanize, slug_from_parts, title_case, truncate_chars,
};
use crate::record::{Assessed, Classified};
use crate::types::{ErrorKind, ItemError, Phase};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named color bins for dominant-color extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Red,
    Gold,
    White,
    Black,
    Pink,
    Green,
    Blue,
    Neutral,
}

impl ColorName {
    pub const ALL: [ColorName; 8] = [
        ColorName::Red,
        ColorName::Gold,
        ColorName::White,
        ColorName::Black,
        ColorName::Pink,
        ColorName::Green,
        ColorName::Blue,
        ColorName::Neutral,
    ];

    /// Bin an RGB triple. Bins are checked in declaration order.
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        if r > 200 && g < 100 && b < 100 {
            ColorName::Red
        } else if r > 200 && g > 150 && b < 100 {
            ColorName::Gold
        } else if r > 200 && g > 200 && b > 200 {
            ColorName::White
        } else if r < 50 && g < 50 && b < 50 {
            ColorName::Black
        } else if r > 200 && g < 150 && b > 150 {
            ColorName::Pink
        } else if g > 150 && r < 100 && b < 100 {
            ColorName::Green
        } else if b > 150 && r < 100 && g < 100 {
            ColorName::Blue
        } else {
            ColorName::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorName::Red => "red",
            ColorName::Gold => "gold",
            ColorName::White => "white",
            ColorName::Black => "black",
            ColorName::Pink => "pink",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Neutral => "neutral",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named bins of a palette, most frequent first, without repeats.
pub fn dominant_color_names(palette: &[[u8; 3]]) -> Vec<ColorName> {
    let mut names = Vec::new();
    for &rgb in palette {
        let name = ColorName::from_rgb(rgb);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Setting {
    Indoor,
    Outdoor,
}

/// Descriptive metadata assigned to one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub location: String,
    pub venue_type: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    pub primary_category: String,
    pub secondary_category: String,
    pub setting: Setting,
    pub subjects: Vec<String>,
    pub elements: Vec<String>,
    pub dominant_colors: Vec<ColorName>,
    pub description: String,
    pub alt_text: String,
    pub title: String,
    pub slug: String,
}

impl Classification {
    /// Search tags: location, primary category and event type, without repeats.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(3);
        for tag in [&self.location, &self.primary_category, &self.event_type] {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }
}

/// Text and enrichment inputs for one classification.
#[derive(Debug, Clone, Default)]
pub struct ClassifyInput<'a> {
    /// Path relative to the image's source tree.
    pub path: &'a str,
    pub context: Option<&'a str>,
    /// Seed for the slug disambiguator (the file stem).
    pub seed: &'a str,
    pub colors: &'a [ColorName],
}

/// Rule tables and defaults, fixed at construction.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RulesConfig,
    color_elements: Vec<(ColorName, String)>,
    defaults: DefaultsConfig,
    limits: ClassificationConfig,
}

fn lowercase_table(table: &[RuleSet]) -> Vec<RuleSet> {
    table
        .iter()
        .map(|rule| RuleSet {
            name: rule.name.clone(),
            keywords: rule
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect(),
        })
        .collect()
}

fn matches(rule: &RuleSet, text: &str) -> bool {
    rule.keywords.iter().any(|k| text.contains(k.as_str()))
}

fn first_match<'r>(table: &'r [RuleSet], text: &str) -> Option<&'r str> {
    table
        .iter()
        .find(|rule| matches(rule, text))
        .map(|rule| rule.name.as_str())
}

fn all_matches(table: &[RuleSet], text: &str) -> Vec<String> {
    table
        .iter()
        .filter(|rule| matches(rule, text))
        .map(|rule| rule.name.clone())
        .collect()
}

impl Classifier {
    pub fn new(config: &PipelineConfig) -> Self {
        let rules = &config.rules;
        Self {
            rules: RulesConfig {
                locations: lowercase_table(&rules.locations),
                events: lowercase_table(&rules.events),
                services: lowercase_table(&rules.services),
                subjects: lowercase_table(&rules.subjects),
                venues: lowercase_table(&rules.venues),
                elements: lowercase_table(&rules.elements),
                color_elements: rules.color_elements.clone(),
            },
            color_elements: rules
                .color_elements
                .iter()
                .filter_map(|ce| ColorName::parse(&ce.color).map(|c| (c, ce.element.clone())))
                .collect(),
            defaults: config.defaults.clone(),
            limits: config.classification.clone(),
        }
    }

    /// Whether `name` is one of the service rules.
    pub fn is_service(&self, name: &str) -> bool {
        self.rules.services.iter().any(|rule| rule.name == name)
    }

    /// Location names in table order, followed by the default location if
    /// no rule carries its name.
    pub fn locations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rules
            .locations
            .iter()
            .map(|rule| rule.name.clone())
            .collect();
        if !names.contains(&self.defaults.location) {
            names.push(self.defaults.location.clone());
        }
        names
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.defaults
    }

    /// Classify one image. The returned slug is not yet unique across the
    /// batch; see [`classify_all`].
    pub fn classify(&self, input: &ClassifyInput<'_>) -> Classification {
        let text = match input.context {
            Some(context) => format!("{} {}", input.path, context),
            None => input.path.to_string(),
        }
        .to_lowercase();

        let location = first_match(&self.rules.locations, &text)
            .unwrap_or(&self.defaults.location)
            .to_string();
        let event = first_match(&self.rules.events, &text);
        let service = first_match(&self.rules.services, &text);
        let venue_type = first_match(&self.rules.venues, &text)
            .unwrap_or(&self.defaults.venue_type)
            .to_string();
        let subjects = all_matches(&self.rules.subjects, &text);

        let mut detected_elements = all_matches(&self.rules.elements, &text);
        for (color, element) in &self.color_elements {
            if input.colors.contains(color) && !detected_elements.contains(element) {
                detected_elements.push(element.clone());
            }
        }

        let description = self.describe(&subjects, event, &venue_type, &location, &detected_elements);
        let alt_text = self.alt_text(&subjects, event, &venue_type, &location);
        let title = truncate_chars(&description, self.limits.title_max_chars);

        let mut slug_parts = vec![location.as_str(), venue_type.as_str()];
        slug_parts.extend(event);
        slug_parts.extend(subjects.first().map(String::as_str));
        let slug = slug_from_parts(&slug_parts, &disambiguator(input.seed));

        let primary_category = event
            .or(service)
            .unwrap_or(&self.defaults.primary_category)
            .to_string();
        let secondary_category = subjects
            .first()
            .cloned()
            .unwrap_or_else(|| self.defaults.secondary_category.clone());
        let setting = if text.contains("outdoor") {
            Setting::Outdoor
        } else {
            Setting::Indoor
        };
        let elements = if detected_elements.is_empty() {
            self.defaults.elements.clone()
        } else {
            detected_elements
        };

        Classification {
            location,
            venue_type,
            event_type: event.unwrap_or(&self.defaults.event_type).to_string(),
            service_type: service.map(str::to_string),
            primary_category,
            secondary_category,
            setting,
            subjects,
            elements,
            dominant_colors: input.colors.to_vec(),
            description,
            alt_text,
            title,
            slug,
        }
    }

    fn describe(
        &self,
        subjects: &[String],
        event: Option<&str>,
        venue_type: &str,
        location: &str,
        elements: &[String],
    ) -> String {
        let mut parts = Vec::new();
        if !subjects.is_empty() {
            parts.push(subjects.join(" and "));
        }
        if let Some(event) = event {
            parts.push(format!("during {}", humanize(event)));
        }
        if !venue_type.is_empty() {
            parts.push(format!("at {venue_type} venue"));
        }
        if !location.is_empty() {
            parts.push(format!("in {}", title_case(location)));
        }
        if !elements.is_empty() {
            let shown: Vec<&str> = elements.iter().take(3).map(String::as_str).collect();
            parts.push(format!("with {}", shown.join(", ")));
        }
        if parts.is_empty() {
            self.defaults.description.clone()
        } else {
            parts.join(" ")
        }
    }

    fn alt_text(
        &self,
        subjects: &[String],
        event: Option<&str>,
        venue_type: &str,
        location: &str,
    ) -> String {
        let mut parts = Vec::new();
        if !subjects.is_empty() {
            parts.push(title_case(&subjects.join(" and ")));
        }
        if let Some(event) = event {
            parts.push(title_case(&humanize(event)));
        }
        if !location.is_empty() {
            parts.push(format!("{} {}", title_case(location), venue_type));
        }
        let alt = if parts.is_empty() {
            self.defaults.alt_text.clone()
        } else {
            parts.join(" - ")
        };
        truncate_chars(&alt, self.limits.alt_text_max_chars)
    }
}

/// Palette parameters for dominant-color extraction, `None` when disabled.
pub fn palette_params(config: &ClassificationConfig) -> Option<PaletteParams> {
    config.dominant_colors.then(|| PaletteParams {
        sample: config.palette_sample,
        max_colors: config.palette_max_colors,
        top: config.palette_top,
    })
}

/// Classify every record in parallel, then make slugs unique in record order.
///
/// Palette failures are reported and leave the record without dominant
/// colors; they never drop it. Records that failed to decode earlier skip
/// palette sampling.
pub fn classify_all(
    records: Vec<Assessed>,
    classifier: &Classifier,
    backend: &impl ImageBackend,
    palette: Option<&PaletteParams>,
) -> (Vec<Classified>, Vec<ItemError>) {
    let classified: Vec<(Assessed, Classification, Option<ItemError>)> = records
        .into_par_iter()
        .map(|record| {
            let mut error = None;
            let colors = match palette {
                Some(params) if record.assessment().dimensions.is_some() => {
                    match backend.palette(&record.path, params) {
                        Ok(palette) => dominant_color_names(&palette),
                        Err(e) => {
                            tracing::warn!(source = %record.source, error = %e, "palette failed");
                            error = Some(ItemError::new(
                                &record.source,
                                Phase::Classify,
                                ErrorKind::Decode,
                                e.to_string(),
                            ));
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            };
            let seed = record.stem();
            let classification = classifier.classify(&ClassifyInput {
                path: &record.relative,
                context: record.context.as_deref(),
                seed: &seed,
                colors: &colors,
            });
            (record, classification, error)
        })
        .collect();

    let mut slugs = SlugAllocator::new();
    let mut errors = Vec::new();
    let records = classified
        .into_iter()
        .map(|(record, mut classification, error)| {
            errors.extend(error);
            classification.slug = slugs.allocate(&classification.slug);
            record.classify(classification)
        })
        .collect();
    (records, errors)
}
