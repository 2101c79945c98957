//! Phase orchestration.
//!
//! ```text
//! registry → dedup → quality → classify → organize ┃ render → aggregate
//!                        plan()                    ┃      build()
//! ```
//!
//! Each phase takes the whole collection from the one before. Phases that
//! read pixels fan out on the rayon pool; `collect` is the barrier. Per-item
//! failures accumulate as [`ItemError`]s and end up in the run report. Only
//! an unreadable feed file or a failure to write the documents stops a run.
//!
//! [`plan`] stops before anything is written, which is what `build
//! --dry-run` shows. [`build`] runs everything.

use crate::classify::{self, Classifier};
use crate::config::PipelineConfig;
use crate::dedup::{self, DuplicateRecord};
use crate::imaging::ImageBackend;
use crate::manifest::{Aggregator, Documents, RunData};
use crate::organize::{self, Planner};
use crate::quality;
use crate::record::Organized;
use crate::registry::{self, RegistryError};
use crate::render::{self, OutputInfo, RenderPlan, RenderStats};
use crate::types::{ItemError, Origin, Phase};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    PhaseStarted {
        phase: Phase,
        count: usize,
    },
    ImageRendered {
        /// 1-based position in the render batch.
        index: usize,
        slug: String,
        source: String,
        outputs: Vec<OutputInfo>,
    },
}

/// Everything decided before the first byte is written.
#[derive(Debug, Default)]
pub struct Plan {
    /// Per-origin counts of every enumerated file, duplicates included.
    pub discovered: BTreeMap<Origin, usize>,
    pub duplicates: Vec<DuplicateRecord>,
    /// Survivors in registry order, with their destination folders.
    pub records: Vec<Organized>,
    pub errors: Vec<ItemError>,
}

impl Plan {
    pub fn total_discovered(&self) -> usize {
        self.discovered.values().sum()
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub documents: Documents,
    /// Document files written this run.
    pub written: Vec<PathBuf>,
}

impl BuildReport {
    pub fn stats(&self) -> &RenderStats {
        &self.documents.run.render
    }

    pub fn errors(&self) -> &[ItemError] {
        &self.documents.run.errors
    }
}

fn started(events: Option<&Sender<PipelineEvent>>, phase: Phase, count: usize) {
    tracing::debug!(%phase, count, "phase started");
    if let Some(tx) = events {
        tx.send(PipelineEvent::PhaseStarted { phase, count }).ok();
    }
}

/// Registry through organization. Reads sources, writes nothing.
pub fn plan(
    root: &Path,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<Plan, PipelineError> {
    started(events, Phase::Registry, 0);
    let registry = registry::enumerate(root, config)?;
    let discovered = registry.count_by_origin();
    let mut errors = registry.errors;
    if registry.images.is_empty() {
        tracing::warn!(root = %root.display(), "no source images found");
    }

    started(events, Phase::Dedup, registry.images.len());
    let deduped = dedup::dedup(registry.images, backend);
    errors.extend(deduped.errors);

    started(events, Phase::Quality, deduped.unique.len());
    let (assessed, quality_errors) = quality::assess_all(deduped.unique, backend);
    errors.extend(quality_errors);

    started(events, Phase::Classify, assessed.len());
    let classifier = Classifier::new(config);
    let palette = classify::palette_params(&config.classification);
    let (classified, classify_errors) =
        classify::classify_all(assessed, &classifier, backend, palette.as_ref());
    errors.extend(classify_errors);

    started(events, Phase::Organize, classified.len());
    let records = organize::organize_all(classified, &Planner::new(config));

    Ok(Plan {
        discovered,
        duplicates: deduped.duplicates,
        records,
        errors,
    })
}

/// Full run: plan, render, aggregate, write documents.
pub fn build(
    root: &Path,
    config: &PipelineConfig,
    backend: &impl ImageBackend,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<BuildReport, PipelineError> {
    let plan = plan(root, config, backend, events)?;
    let mut errors = plan.errors;

    started(events, Phase::Render, plan.records.len());
    let render_plan = RenderPlan::new(root, config);
    let rendered = render::render_all(plan.records, &render_plan, backend, events);
    errors.extend(rendered.errors);

    started(events, Phase::Aggregate, rendered.records.len());
    let aggregator = Aggregator::new(Classifier::new(config).locations(), &config.landing);
    let generated_at = chrono::Utc::now().to_rfc3339();
    let documents = aggregator.aggregate(&RunData {
        generated_at: &generated_at,
        discovered: &plan.discovered,
        duplicates: &plan.duplicates,
        records: &rendered.records,
        errors: &errors,
        stats: &rendered.stats,
    });

    let metadata_dir = render_plan.output_root().join(&config.output.metadata_dir);
    let written = documents.write(&metadata_dir)?;
    tracing::debug!(dir = %metadata_dir.display(), files = written.len(), "documents written");
    Ok(BuildReport { documents, written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::list_files;
    use std::fs;
    use tempfile::TempDir;

    /// A project with placeholder source files under `raw/local`.
    fn project(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for name in files {
            let path = tmp.path().join("raw/local").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("bytes of {name}")).unwrap();
        }
        tmp
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn plan_writes_nothing() {
        let tmp = project(&["udaipur-palace-sangeet-001.jpg"]);
        let plan = plan(tmp.path(), &PipelineConfig::default(), &MockBackend::new(), None).unwrap();

        assert_eq!(plan.total_discovered(), 1);
        assert_eq!(plan.records.len(), 1);
        assert!(!tmp.path().join("assets").exists());
    }

    #[test]
    fn sangeet_filename_routes_to_location_and_event() {
        let tmp = project(&["udaipur-palace-sangeet-001.jpg"]);
        let plan = plan(tmp.path(), &PipelineConfig::default(), &MockBackend::new(), None).unwrap();

        let record = &plan.records[0];
        let c = record.classification();
        assert_eq!(c.location, "udaipur");
        assert_eq!(c.event_type, "sangeet");
        assert_eq!(c.venue_type, "palace");
        assert!(record.destinations().contains(&"by-location/udaipur/gallery".to_string()));
        assert!(record.destinations().contains(&"by-event/sangeet".to_string()));
    }

    #[test]
    fn duplicate_keeps_first_in_registry_order() {
        let tmp = project(&["a-goa-beach.jpg", "b-copy.jpg"]);
        let backend = MockBackend::new()
            .with_fingerprint("a-goa-beach.jpg", "same")
            .with_fingerprint("b-copy.jpg", "same");
        let plan = plan(tmp.path(), &PipelineConfig::default(), &backend, None).unwrap();

        assert_eq!(plan.duplicates.len(), 1);
        assert_eq!(plan.duplicates[0].original, "raw/local/a-goa-beach.jpg");
        assert_eq!(plan.records.len(), 1);
        assert!(plan.records[0].slug().starts_with("goa-"));
    }

    #[test]
    fn build_writes_all_documents() {
        let tmp = project(&["goa-beach-haldi.jpg", "udaipur-palace-sangeet-001.jpg"]);
        let backend = MockBackend::new().with_dimensions("goa-beach-haldi.jpg", 2400, 1600);
        let report = build(tmp.path(), &PipelineConfig::default(), &backend, None).unwrap();

        let metadata = tmp.path().join("assets/metadata");
        for name in [
            "manifest.json",
            "alt-texts.json",
            "landing-page-data.json",
            "duplicates-report.json",
            "quality-report.json",
            "discovery-report.json",
            "run-report.json",
        ] {
            assert!(metadata.join(name).exists(), "missing {name}");
        }
        assert_eq!(report.written.len(), 7);
        assert!(report.errors().is_empty(), "{:?}", report.errors());

        let manifest = read_json(&metadata.join("manifest.json"));
        assert_eq!(manifest["totalImages"], 2);
        let landing = read_json(&metadata.join("landing-page-data.json"));
        assert_eq!(
            landing["locations"]["goa"]["heroImages"].as_array().unwrap().len(),
            1
        );
        assert!(
            landing["locations"]["udaipur"]["heroImages"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn second_build_renders_nothing() {
        let tmp = project(&["goa-beach.jpg"]);
        let config = PipelineConfig::default();
        build(tmp.path(), &config, &MockBackend::new(), None).unwrap();
        let before = list_files(tmp.path());

        let backend = MockBackend::new();
        let report = build(tmp.path(), &config, &backend, None).unwrap();

        assert!(backend.render_calls().is_empty());
        assert_eq!(report.stats().created(), 0);
        assert_eq!(list_files(tmp.path()), before);
    }

    #[test]
    fn empty_registry_still_writes_documents() {
        let tmp = TempDir::new().unwrap();
        let report = build(tmp.path(), &PipelineConfig::default(), &MockBackend::new(), None).unwrap();

        assert_eq!(report.documents.manifest.total_images, 0);
        let dups = read_json(&tmp.path().join("assets/metadata/duplicates-report.json"));
        assert_eq!(dups["totalDuplicates"], 0);
    }

    #[test]
    fn undecodable_source_is_reported_not_fatal() {
        let tmp = project(&["bad.jpg", "goa-ok.jpg"]);
        let backend = MockBackend::new().with_undecodable("bad.jpg");
        let report = build(tmp.path(), &PipelineConfig::default(), &backend, None).unwrap();

        assert_eq!(report.documents.manifest.total_images, 1);
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.errors()[0].phase, Phase::Dedup);
        let run = read_json(&tmp.path().join("assets/metadata/run-report.json"));
        assert_eq!(run["totalErrors"], 1);
        // the undecodable file never reached render
        assert!(
            backend
                .render_calls()
                .iter()
                .all(|op| !matches!(op, RecordedOp::Render { source, .. } if source == "bad.jpg"))
        );
    }

    #[test]
    fn events_cover_every_phase() {
        let tmp = project(&["goa-a.jpg"]);
        let (tx, rx) = std::sync::mpsc::channel();
        build(tmp.path(), &PipelineConfig::default(), &MockBackend::new(), Some(&tx)).unwrap();
        drop(tx);

        let phases: Vec<Phase> = rx
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::PhaseStarted { phase, .. } => Some(phase),
                PipelineEvent::ImageRendered { .. } => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::Registry,
                Phase::Dedup,
                Phase::Quality,
                Phase::Classify,
                Phase::Organize,
                Phase::Render,
                Phase::Aggregate
            ]
        );
    }
}
