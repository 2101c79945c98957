//! Quality assessor: resolution tiers and usage classes.
//!
//! Two independent rule sets read the same dimensions:
//!
//! | max(width, height) | score |   | width | adds |
//! |---|---|---|---|---|
//! | ≥ 3000 | 10 | | ≥ 1920 | hero-banner |
//! | ≥ 1920 | 8 | | ≥ 1200 | og-image |
//! | ≥ 1200 | 6 | | ≥ 800 | gallery |
//! | else | 4 | | any | thumbnail |
//!
//! The score looks at the longer edge, usage classes at width only. A tall
//! narrow image can score 10 and still be thumbnail-only.

use crate::imaging::{Dimensions, ImageBackend};
use crate::record::{Assessed, Assessment, Deduped};
use crate::types::{ErrorKind, ItemError, Phase, UsageClass};
use rayon::prelude::*;

/// Resolution tier from the longer edge.
pub fn quality_score(dims: Dimensions) -> u8 {
    match dims.max_edge() {
        e if e >= 3000 => 10,
        e if e >= 1920 => 8,
        e if e >= 1200 => 6,
        _ => 4,
    }
}

/// Usage classes from width, in declaration order.
pub fn usage_classes(dims: Dimensions) -> Vec<UsageClass> {
    let mut usage = Vec::with_capacity(4);
    if dims.width >= 1920 {
        usage.push(UsageClass::HeroBanner);
    }
    if dims.width >= 1200 {
        usage.push(UsageClass::OgImage);
    }
    if dims.width >= 800 {
        usage.push(UsageClass::Gallery);
    }
    usage.push(UsageClass::Thumbnail);
    usage
}

pub fn assess(dims: Dimensions) -> Assessment {
    Assessment {
        dimensions: Some(dims),
        quality_score: quality_score(dims),
        usage: usage_classes(dims),
    }
}

/// Assess every record in parallel. Decode failures keep the record with an
/// empty assessment and are reported.
pub fn assess_all(
    records: Vec<Deduped>,
    backend: &impl ImageBackend,
) -> (Vec<Assessed>, Vec<ItemError>) {
    let assessed: Vec<(Assessed, Option<ItemError>)> = records
        .into_par_iter()
        .map(|record| match backend.identify(&record.path) {
            Ok(dims) => (record.assess(assess(dims)), None),
            Err(e) => {
                tracing::warn!(source = %record.source, error = %e, "identify failed");
                let error =
                    ItemError::new(&record.source, Phase::Quality, ErrorKind::Decode, e.to_string());
                (record.assess(Assessment::undecodable()), Some(error))
            }
        })
        .collect();
    let mut errors = Vec::new();
    let records = assessed
        .into_iter()
        .map(|(record, error)| {
            errors.extend(error);
            record
        })
        .collect();
    (records, errors)
}
