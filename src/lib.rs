//! # Photo Pipeline
//!
//! Ingests a mixed pool of photographs (crawled from websites and copied from
//! local folders), drops near-duplicates, classifies what remains by keyword
//! rules, and renders a catalog of web-ready derivatives with JSON documents
//! describing every asset.
//!
//! # Architecture: Seven-Phase Pipeline
//!
//! ```text
//! 1. Registry   source trees / feed  →  Discovered    (ordered file list)
//! 2. Dedup      perceptual hash      →  Deduped       (first seen wins)
//! 3. Quality    dimensions           →  Assessed      (score + usage classes)
//! 4. Classify   keyword rules        →  Classified    (tags, alt text, slug)
//! 5. Organize   decision table       →  Organized     (destination folders)
//! 6. Render     resize + encode      →  Rendered      (WebP/AVIF, blur, originals)
//! 7. Aggregate  projections          →  metadata/*.json
//! ```
//!
//! Each phase takes the whole collection from the previous one. Phases that
//! touch pixels fan out across the rayon pool. The record type changes at
//! every step (see [`record`]), so a phase can only be handed records that
//! went through its predecessor.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, stock defaults, merging, validation, `gen-config` template |
//! | [`types`] | Shared enums: origin, usage class, encoding, phase, per-item errors |
//! | [`record`] | Per-image record states from `Discovered` to `Rendered` |
//! | [`registry`] | Source enumeration: walked source trees or a crawl feed, plus sidecar context |
//! | [`dedup`] | Perceptual fingerprints and the first-seen index |
//! | [`quality`] | Resolution score and usage classes |
//! | [`naming`] | Slugs, title case, truncation, disambiguators |
//! | [`classify`] | Rule-table classification and dominant-color bins |
//! | [`organize`] | Destination folder planning |
//! | [`imaging`] | Pure-Rust image operations behind the `ImageBackend` trait |
//! | [`cache`] | Blur placeholder cache for incremental runs |
//! | [`render`] | Derivative rendering, originals, render statistics |
//! | [`manifest`] | JSON document projections and writer |
//! | [`pipeline`] | Phase orchestration and progress events |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Rules Are Configuration
//!
//! Every keyword table, default, and threshold lives in `config.toml`. The
//! stock values describe one destination-wedding dataset; another tenant
//! replaces the tables without touching code. Tables are ordered lists, so
//! "first match wins" is a property of the file, not of hash-map iteration.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and resizing use the `image` crate, fingerprints `image_hasher`,
//! AVIF goes through `image`'s rav1e encoder and lossy WebP through `webp`.
//! Nothing is shelled out to an external tool.
//!
//! ## Idempotent Outputs
//!
//! A derivative or copy that already exists is never rewritten. The blur
//! placeholder, which has no file of its own, is cached by source content
//! hash. A second run over unchanged sources writes nothing but the JSON
//! documents, and those differ only in `generatedAt`.

pub mod cache;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod imaging;
pub mod manifest;
pub mod naming;
pub mod organize;
pub mod output;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod registry;
pub mod render;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
