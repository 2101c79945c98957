//! Dedup engine: perceptual fingerprints, first seen wins.
//!
//! Fingerprinting decodes every image and runs on the rayon pool. Claiming
//! fingerprints is order-sensitive, so it happens afterwards on one thread,
//! walking results in registry order through a [`FirstSeenIndex`]:
//!
//! ```text
//! registry ──par_iter──▶ [(image, Result<fingerprint>)]  (order kept)
//!                                 │
//!                      sequential claim, registry order
//!                                 │
//!          ┌──────────────────────┼─────────────────────┐
//!       First                DuplicateOf             decode error
//!     → unique              → DuplicateRecord        → ItemError
//! ```
//!
//! Colliding fingerprints are duplicates with no pixel comparison. Two
//! distinct photos that hash alike lose the later one; that is the accepted
//! cost of a perceptual key.

use crate::imaging::ImageBackend;
use crate::record::{Deduped, Discovered};
use crate::types::{ErrorKind, ItemError, Phase};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// One near-duplicate and the representative it collided with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRecord {
    pub fingerprint: String,
    /// Registry path of the representative.
    pub original: String,
    /// Registry path of the dropped file.
    pub duplicate: String,
}

/// Outcome of claiming a fingerprint.
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    First,
    /// Already claimed by the contained path.
    DuplicateOf(String),
}

/// Fingerprint → first path that claimed it.
#[derive(Debug, Default)]
pub struct FirstSeenIndex {
    seen: HashMap<String, String>,
}

impl FirstSeenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, fingerprint: &str, path: &str) -> Claim {
        match self.seen.get(fingerprint) {
            Some(original) => Claim::DuplicateOf(original.clone()),
            None => {
                self.seen.insert(fingerprint.to_string(), path.to_string());
                Claim::First
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Representatives in registry order.
    pub unique: Vec<Deduped>,
    pub duplicates: Vec<DuplicateRecord>,
    /// Images that could not be fingerprinted. Neither unique nor duplicate.
    pub errors: Vec<ItemError>,
}

/// Partition the registry into representatives and duplicates.
pub fn dedup(images: Vec<Discovered>, backend: &impl ImageBackend) -> DedupOutcome {
    let fingerprinted: Vec<_> = images
        .into_par_iter()
        .map(|image| {
            let fingerprint = backend.fingerprint(&image.path);
            (image, fingerprint)
        })
        .collect();

    let mut index = FirstSeenIndex::new();
    let mut outcome = DedupOutcome::default();
    for (image, fingerprint) in fingerprinted {
        let fingerprint = match fingerprint {
            Ok(fp) => fp,
            Err(e) => {
                tracing::warn!(source = %image.source, error = %e, "fingerprint failed");
                outcome.errors.push(ItemError::new(
                    &image.source,
                    Phase::Dedup,
                    ErrorKind::Decode,
                    e.to_string(),
                ));
                continue;
            }
        };
        match index.claim(&fingerprint, &image.source) {
            Claim::First => outcome.unique.push(image.dedup(fingerprint)),
            Claim::DuplicateOf(original) => {
                tracing::debug!(duplicate = %image.source, %original, "duplicate");
                outcome.duplicates.push(DuplicateRecord {
                    fingerprint,
                    original,
                    duplicate: image.source,
                });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::discovered;
    use std::collections::HashSet;

    // =========================================================================
    // FirstSeenIndex
    // =========================================================================

    #[test]
    fn first_claim_wins() {
        let mut index = FirstSeenIndex::new();
        assert_eq!(index.claim("ff", "a.jpg"), Claim::First);
        assert_eq!(index.claim("ff", "b.jpg"), Claim::DuplicateOf("a.jpg".into()));
        assert_eq!(index.claim("00", "c.jpg"), Claim::First);
        assert_eq!(index.len(), 2);
    }

    // =========================================================================
    // dedup()
    // =========================================================================

    #[test]
    fn distinct_fingerprints_all_unique() {
        let backend = MockBackend::new();
        let out = dedup(vec![discovered("a.jpg"), discovered("b.jpg")], &backend);
        assert_eq!(out.unique.len(), 2);
        assert!(out.duplicates.is_empty());
        assert_eq!(out.unique[0].fingerprint(), "a.jpg");
    }

    #[test]
    fn earlier_registry_entry_is_representative() {
        let backend = MockBackend::new()
            .with_fingerprint("second.jpg", "same")
            .with_fingerprint("first.jpg", "same");
        let out = dedup(
            vec![discovered("first.jpg"), discovered("second.jpg")],
            &backend,
        );

        assert_eq!(out.unique.len(), 1);
        assert_eq!(out.unique[0].relative, "first.jpg");
        assert_eq!(
            out.duplicates,
            vec![DuplicateRecord {
                fingerprint: "same".into(),
                original: "raw/local/first.jpg".into(),
                duplicate: "raw/local/second.jpg".into(),
            }]
        );
    }

    #[test]
    fn many_duplicates_point_at_one_original() {
        let backend = MockBackend::new()
            .with_fingerprint("a.jpg", "x")
            .with_fingerprint("b.jpg", "x")
            .with_fingerprint("c.jpg", "x");
        let out = dedup(
            vec![discovered("a.jpg"), discovered("b.jpg"), discovered("c.jpg")],
            &backend,
        );
        assert_eq!(out.unique.len(), 1);
        assert_eq!(out.duplicates.len(), 2);
        assert!(out.duplicates.iter().all(|d| d.original == "raw/local/a.jpg"));
    }

    #[test]
    fn survivors_never_share_a_fingerprint() {
        let backend = MockBackend::new()
            .with_fingerprint("1.jpg", "p")
            .with_fingerprint("2.jpg", "q")
            .with_fingerprint("3.jpg", "p")
            .with_fingerprint("4.jpg", "r")
            .with_fingerprint("5.jpg", "q");
        let images = (1..=5).map(|i| discovered(&format!("{i}.jpg"))).collect();
        let out = dedup(images, &backend);

        let unique: HashSet<&str> = out.unique.iter().map(|r| r.fingerprint()).collect();
        assert_eq!(unique.len(), out.unique.len());
        let order: Vec<&str> = out.unique.iter().map(|r| r.relative.as_str()).collect();
        assert_eq!(order, vec!["1.jpg", "2.jpg", "4.jpg"]);
    }

    #[test]
    fn undecodable_is_excluded_and_reported() {
        let backend = MockBackend::new().with_undecodable("bad.jpg");
        let out = dedup(vec![discovered("bad.jpg"), discovered("ok.jpg")], &backend);

        assert_eq!(out.unique.len(), 1);
        assert!(out.duplicates.is_empty());
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].path, "raw/local/bad.jpg");
        assert_eq!(out.errors[0].kind, ErrorKind::Decode);
    }

    #[test]
    fn empty_registry_is_empty_outcome() {
        let out = dedup(Vec::new(), &MockBackend::new());
        assert!(out.unique.is_empty());
        assert!(out.duplicates.is_empty());
        assert!(out.errors.is_empty());
    }
}
