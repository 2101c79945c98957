//! Deterministic text helpers for generated names.
//!
//! Everything here is pure and byte-reproducible: the same input always
//! yields the same slug, title or truncation.
//!
//! | Function | Example |
//! |---|---|
//! | [`sanitize_slug`] | `"Udaipur Palace"` → `"udaipur-palace"` |
//! | [`slug_from_parts`] | `["udaipur", "palace"]` + `"3f2a9c"` → `"udaipur-palace-3f2a9c"` |
//! | [`disambiguator`] | `"IMG_0042"` → first 6 hex chars of its SHA-256 |
//! | [`title_case`] | `"couple-portrait and bridal"` → `"Couple-Portrait And Bridal"` |
//! | [`humanize`] | `"wedding-ceremony"` → `"wedding ceremony"` |
//! | [`truncate_chars`] | cut at a character (not byte) boundary |

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Length of the content-derived suffix that keeps slugs distinct.
pub const DISAMBIGUATOR_LEN: usize = 6;

/// Lower-case a string and reduce it to `[a-z0-9-]`.
///
/// - Whitespace, underscores and other punctuation become dashes
/// - Consecutive dashes collapse into one
/// - Leading and trailing dashes are stripped
pub fn sanitize_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Short hex digest of `seed`, used as the slug suffix.
pub fn disambiguator(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..DISAMBIGUATOR_LEN].to_string()
}

/// Join slug tokens and a disambiguator, skipping empty tokens.
pub fn slug_from_parts(parts: &[&str], suffix: &str) -> String {
    let joined = parts
        .iter()
        .copied()
        .chain(std::iter::once(suffix))
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("-");
    sanitize_slug(&joined)
}

/// Capitalize the first letter of every alphabetic run and lower-case the rest.
///
/// Word boundaries are any non-alphabetic character, so
/// `"couple-portrait"` becomes `"Couple-Portrait"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Replace dashes with spaces.
pub fn humanize(token: &str) -> String {
    token.replace('-', " ")
}

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Hands out unique slugs in call order.
///
/// The first caller keeps a slug as-is; later callers asking for the same
/// slug get `-2`, `-3`, … appended.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    taken: HashMap<String, u32>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, slug: &str) -> String {
        let Some(&last) = self.taken.get(slug) else {
            self.taken.insert(slug.to_string(), 1);
            return slug.to_string();
        };
        let mut n = last;
        loop {
            n += 1;
            let candidate = format!("{slug}-{n}");
            if !self.taken.contains_key(&candidate) {
                self.taken.insert(slug.to_string(), n);
                self.taken.insert(candidate.clone(), 1);
                return candidate;
            }
        }
    }
}
