//! Organization planner: classified record → destination folders.
//!
//! Pure data transformation; nothing here touches the filesystem.
//!
//! ```text
//! by-location/{location}/{subfolder}     always
//! by-event/{event}                       event differs from defaults.event_type
//! by-service/{service}                   primary category is a service rule
//! ```
//!
//! Subfolder decision table, first row that applies:
//!
//! | Condition | Subfolder |
//! |---|---|
//! | quality ≥ `organize.hero_min_quality` and hero-banner usage | `heroes` |
//! | subjects contain `organize.venue_subject` | `venues` |
//! | subjects contain any of `organize.couple_subjects` | `couples` |
//! | otherwise | `gallery` |

use crate::classify::Classification;
use crate::config::PipelineConfig;
use crate::record::{Assessment, Classified, Organized};
use crate::types::UsageClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subfolder {
    Heroes,
    Venues,
    Couples,
    Gallery,
}

impl Subfolder {
    pub fn as_str(self) -> &'static str {
        match self {
            Subfolder::Heroes => "heroes",
            Subfolder::Venues => "venues",
            Subfolder::Couples => "couples",
            Subfolder::Gallery => "gallery",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Planner {
    hero_min_quality: u8,
    venue_subject: String,
    couple_subjects: Vec<String>,
    default_event: String,
    services: Vec<String>,
}

impl Planner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            hero_min_quality: config.organize.hero_min_quality,
            venue_subject: config.organize.venue_subject.clone(),
            couple_subjects: config.organize.couple_subjects.clone(),
            default_event: config.defaults.event_type.clone(),
            services: config
                .rules
                .services
                .iter()
                .map(|rule| rule.name.clone())
                .collect(),
        }
    }

    pub fn subfolder(&self, assessment: &Assessment, classification: &Classification) -> Subfolder {
        let subjects = &classification.subjects;
        if assessment.quality_score >= self.hero_min_quality
            && assessment.has_usage(UsageClass::HeroBanner)
        {
            Subfolder::Heroes
        } else if subjects.contains(&self.venue_subject) {
            Subfolder::Venues
        } else if subjects.iter().any(|s| self.couple_subjects.contains(s)) {
            Subfolder::Couples
        } else {
            Subfolder::Gallery
        }
    }

    /// Ordered destination folders. Never empty.
    pub fn plan(&self, assessment: &Assessment, classification: &Classification) -> Vec<String> {
        let mut folders = vec![format!(
            "by-location/{}/{}",
            classification.location,
            self.subfolder(assessment, classification).as_str()
        )];
        if classification.event_type != self.default_event {
            folders.push(format!("by-event/{}", classification.event_type));
        }
        if self.services.contains(&classification.primary_category) {
            folders.push(format!("by-service/{}", classification.primary_category));
        }
        folders
    }
}

pub fn organize_all(records: Vec<Classified>, planner: &Planner) -> Vec<Organized> {
    records
        .into_iter()
        .map(|record| {
            let folders = planner.plan(record.assessment(), record.classification());
            record.organize(folders)
        })
        .collect()
}
