//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! The primary display for every image is its semantic identity (position
//! and slug), with filesystem paths shown as secondary context on indented
//! `Source:` lines. The output reads as an inventory of what the pipeline
//! decided, while still letting users trace each entry back to a file.
//!
//! # Output Format
//!
//! ## Build (progress)
//!
//! ```text
//! ==> Dedup (12 images)
//! ==> Render (10 images)
//!     001 udaipur-palace-sangeet-3fa2c1
//!         Source: raw/local/udaipur-palace-sangeet-001.jpg
//!         hero.webp: encoded
//!         hero.avif: existing
//!         blur: cached
//!         original: copied
//! ```
//!
//! ## Plan (`build --dry-run`)
//!
//! ```text
//! 001 udaipur-palace-sangeet-3fa2c1
//!     Source: raw/local/udaipur-palace-sangeet-001.jpg
//!     Quality: 4 (thumbnail)
//!     → by-location/udaipur/gallery
//!     → by-event/sangeet
//!
//! 12 discovered, 2 duplicates, 10 planned
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::classify::Classification;
use crate::dedup::DuplicateRecord;
use crate::pipeline::{BuildReport, PipelineEvent, Plan};
use crate::record::Assessment;
use crate::render::OutputStatus;
use crate::types::{ItemError, Phase};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an image line: positional index + slug.
///
/// ```text
/// 001 goa-beach-wedding-3fa2c1
/// ```
fn image_line(index: usize, slug: &str) -> String {
    format!("{} {}", format_index(index), slug)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

fn phase_title(phase: Phase) -> &'static str {
    match phase {
        Phase::Registry => "Registry",
        Phase::Dedup => "Dedup",
        Phase::Quality => "Quality",
        Phase::Classify => "Classify",
        Phase::Organize => "Organize",
        Phase::Render => "Render",
        Phase::Aggregate => "Aggregate",
    }
}

fn quality_line(assessment: &Assessment) -> String {
    if assessment.dimensions.is_none() {
        return "Quality: 0 (undecodable)".to_string();
    }
    let usage: Vec<&str> = assessment.usage.iter().map(|u| u.as_str()).collect();
    format!("Quality: {} ({})", assessment.quality_score, usage.join(", "))
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::PhaseStarted { phase, count } => match phase {
            Phase::Registry => vec![format!("==> {}", phase_title(*phase))],
            _ => vec![format!(
                "==> {} ({})",
                phase_title(*phase),
                plural(*count, "image")
            )],
        },
        PipelineEvent::ImageRendered {
            index,
            slug,
            source,
            outputs,
        } => {
            let mut lines = Vec::with_capacity(outputs.len() + 2);
            lines.push(format!("{}{}", indent(1), image_line(*index, slug)));
            lines.push(format!("{}Source: {}", indent(2), source));
            for output in outputs {
                let status = match output.status {
                    OutputStatus::Existing => "existing",
                    OutputStatus::Cached => "cached",
                    OutputStatus::Encoded => "encoded",
                    OutputStatus::Copied => "copied",
                    OutputStatus::Failed => "FAILED",
                };
                lines.push(format!("{}{}: {}", indent(2), output.label, status));
            }
            lines
        }
    }
}

// ============================================================================
// Plan (dry run)
// ============================================================================

/// Format the organization plan: one entry per surviving image.
pub fn format_plan(plan: &Plan) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, record) in plan.records.iter().enumerate() {
        lines.push(image_line(i + 1, record.slug()));
        lines.push(format!("{}Source: {}", indent(1), record.source));
        lines.push(format!("{}{}", indent(1), quality_line(record.assessment())));
        for folder in record.destinations() {
            lines.push(format!("{}\u{2192} {}", indent(1), folder));
        }
    }
    if !plan.records.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} discovered, {}, {} planned",
        plan.total_discovered(),
        plural(plan.duplicates.len(), "duplicate"),
        plan.records.len()
    ));
    lines.extend(format_errors(&plan.errors));
    lines
}

pub fn print_plan(plan: &Plan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Dedup
// ============================================================================

/// Format the duplicate report grouped by representative.
///
/// ```text
/// raw/local/a.jpg
///     = raw/website/a-copy.jpg
/// ```
pub fn format_duplicates(unique: usize, duplicates: &[DuplicateRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut last_original: Option<&str> = None;
    let mut sorted: Vec<&DuplicateRecord> = duplicates.iter().collect();
    // stable: keeps registry order within each group
    sorted.sort_by(|a, b| a.original.cmp(&b.original));
    for dup in sorted {
        if last_original != Some(dup.original.as_str()) {
            lines.push(dup.original.clone());
            last_original = Some(dup.original.as_str());
        }
        lines.push(format!("{}= {}", indent(1), dup.duplicate));
    }
    if !duplicates.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} unique, {}",
        unique,
        plural(duplicates.len(), "duplicate")
    ));
    lines
}

pub fn print_duplicates(unique: usize, duplicates: &[DuplicateRecord]) {
    for line in format_duplicates(unique, duplicates) {
        println!("{}", line);
    }
}

// ============================================================================
// Classify
// ============================================================================

/// Format a single classification as labelled fields.
pub fn format_classification(c: &Classification) -> Vec<String> {
    let mut lines = vec![
        c.slug.clone(),
        format!("{}Location: {}", indent(1), c.location),
        format!("{}Venue: {}", indent(1), c.venue_type),
        format!("{}Event: {}", indent(1), c.event_type),
    ];
    if let Some(service) = &c.service_type {
        lines.push(format!("{}Service: {}", indent(1), service));
    }
    lines.push(format!(
        "{}Category: {} / {}",
        indent(1),
        c.primary_category,
        c.secondary_category
    ));
    if !c.subjects.is_empty() {
        lines.push(format!("{}Subjects: {}", indent(1), c.subjects.join(", ")));
    }
    lines.push(format!("{}Elements: {}", indent(1), c.elements.join(", ")));
    lines.push(format!("{}Description: {}", indent(1), c.description));
    lines.push(format!("{}Alt: {}", indent(1), c.alt_text));
    lines
}

pub fn print_classification(c: &Classification) {
    for line in format_classification(c) {
        println!("{}", line);
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format per-item errors, one per line under a header. Empty when clean.
pub fn format_errors(errors: &[ItemError]) -> Vec<String> {
    if errors.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("Errors ({})", errors.len())];
    for error in errors {
        lines.push(format!("{}{}", indent(1), error));
    }
    lines
}

/// Format the end-of-build summary: render stats, documents, errors.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let stats = report.stats();
    let manifest = &report.documents.manifest;
    let mut lines = vec![
        format!(
            "{} in manifest, {}",
            plural(manifest.total_images, "image"),
            plural(report.documents.duplicates.total_duplicates, "duplicate")
        ),
        format!("Render: {}", stats),
    ];
    for (encoding, enc) in &stats.encodings {
        lines.push(format!(
            "{}{}: {} created, {} existing, {} failed",
            indent(1),
            encoding,
            enc.created,
            enc.existing,
            enc.failed
        ));
    }
    lines.push(format!(
        "{}originals: {} copied, {} existing",
        indent(1),
        stats.originals_copied,
        stats.originals_existing
    ));
    lines.push("Documents".to_string());
    for path in &report.written {
        lines.push(format!("{}{}", indent(1), path.display()));
    }
    lines.extend(format_errors(report.errors()));
    lines
}

pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
