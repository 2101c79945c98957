//! End-to-end builds with the real pure-Rust backend.
//!
//! Fixtures are generated with the `image` crate into a temporary project.
//! Patterns are blocky so their perceptual hashes are far apart; only
//! byte-identical pixels are expected to collide.
//!
//! Run with: cargo test --test pipeline_idempotence

use photo_pipeline::config;
use photo_pipeline::imaging::RustBackend;
use photo_pipeline::pipeline;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Small catalog so AVIF encoding stays fast in debug builds.
const SMALL_CATALOG: &str = r#"
[images]
avif_speed = 10

[[images.sizes]]
name = "hero"
width = 192
height = 108

[[images.sizes]]
name = "large"
width = 140

[[images.sizes]]
name = "card"
width = 80
height = 60

[[images.sizes]]
name = "thumbnail"
width = 40
height = 30

[[images.sizes]]
name = "og"
width = 120
height = 63
"#;

const DOCUMENTS: [&str; 6] = [
    "manifest.json",
    "alt-texts.json",
    "landing-page-data.json",
    "duplicates-report.json",
    "quality-report.json",
    "discovery-report.json",
];

enum Pattern {
    /// Dark left half, light right half.
    Vertical,
    /// Dark top half, light bottom half.
    Horizontal,
    /// 4×4 board of dark and light blocks.
    Checker,
}

fn write_image(path: &Path, width: u32, height: u32, pattern: Pattern) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let light = match pattern {
            Pattern::Vertical => x >= width / 2,
            Pattern::Horizontal => y >= height / 2,
            Pattern::Checker => (x * 4 / width + y * 4 / height) % 2 == 0,
        };
        if light {
            image::Rgb([230, 200, 40])
        } else {
            image::Rgb([20, 30, 120])
        }
    });
    img.save(path).unwrap();
}

/// Every file under `root` except the JSON documents, with its bytes.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.path().components().any(|c| c.as_os_str() == "metadata"))
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn read_document(root: &Path, name: &str) -> serde_json::Value {
    let path = root.join("assets/metadata").join(name);
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    if let Some(object) = value.as_object_mut() {
        object.remove("generatedAt");
    }
    value
}

#[test]
fn second_build_changes_nothing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("config.toml"), SMALL_CATALOG).unwrap();
    write_image(
        &root.join("raw/local/udaipur-palace-sangeet-001.jpg"),
        320,
        240,
        Pattern::Vertical,
    );
    write_image(
        &root.join("raw/website/goa-beach-haldi.png"),
        300,
        200,
        Pattern::Horizontal,
    );
    let config = config::load_config(root).unwrap();
    let backend = RustBackend::new();

    let first = pipeline::build(root, &config, &backend, None).unwrap();
    assert!(first.errors().is_empty(), "{:?}", first.errors());
    assert_eq!(first.stats().created(), 20);
    let files = snapshot(root);
    let documents: Vec<serde_json::Value> =
        DOCUMENTS.iter().map(|name| read_document(root, name)).collect();

    let second = pipeline::build(root, &config, &backend, None).unwrap();
    assert!(second.errors().is_empty(), "{:?}", second.errors());
    assert_eq!(second.stats().created(), 0);
    assert_eq!(second.stats().existing(), 20);
    assert_eq!(second.stats().previews.hits, 2);
    assert_eq!(second.stats().originals_copied, 0);

    let after = snapshot(root);
    assert_eq!(
        files.keys().collect::<Vec<_>>(),
        after.keys().collect::<Vec<_>>()
    );
    assert!(files == after, "file contents changed on the second build");
    for (name, before) in DOCUMENTS.iter().zip(&documents) {
        assert_eq!(&read_document(root, name), before, "{name} changed");
    }
}

#[test]
fn sangeet_file_lands_in_location_and_event_folders() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("config.toml"), SMALL_CATALOG).unwrap();
    write_image(
        &root.join("raw/local/udaipur-palace-sangeet-001.jpg"),
        320,
        240,
        Pattern::Checker,
    );
    let config = config::load_config(root).unwrap();

    let report = pipeline::build(root, &config, &RustBackend::new(), None).unwrap();

    let image = &report.documents.manifest.images[0];
    assert_eq!(image.classification.location, "udaipur");
    assert_eq!(image.classification.event_type, "sangeet");
    assert_eq!(image.classification.venue_type, "palace");
    assert!(
        image
            .destination_folders
            .contains(&"by-location/udaipur/gallery".to_string())
    );
    assert!(image.destination_folders.contains(&"by-event/sangeet".to_string()));

    let slug = &image.id;
    let assets = root.join("assets");
    assert!(assets.join(format!("by-location/udaipur/gallery/{slug}.jpg")).exists());
    assert!(assets.join(format!("by-event/sangeet/{slug}.jpg")).exists());
    assert!(assets.join(format!("website-ready/original/{slug}.jpg")).exists());
    assert!(assets.join(format!("website-ready/webp/cards/{slug}.webp")).exists());
    assert!(assets.join(format!("website-ready/avif/heros/{slug}.avif")).exists());
    assert!(
        image
            .blur_placeholder
            .as_deref()
            .unwrap()
            .starts_with("data:image/webp;base64,")
    );
}

#[test]
fn identical_pixels_keep_the_first_file() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_image(&root.join("raw/local/a-goa-first.png"), 200, 160, Pattern::Checker);
    write_image(
        &root.join("raw/local/b-udaipur-second.png"),
        200,
        160,
        Pattern::Checker,
    );
    let config = config::load_config(root).unwrap();

    let plan = pipeline::plan(root, &config, &RustBackend::new(), None).unwrap();

    assert_eq!(plan.duplicates.len(), 1);
    assert_eq!(plan.duplicates[0].original, "raw/local/a-goa-first.png");
    assert_eq!(plan.duplicates[0].duplicate, "raw/local/b-udaipur-second.png");
    assert_eq!(plan.records.len(), 1);
    assert!(plan.records[0].slug().starts_with("goa-"));
}

#[test]
fn small_square_is_never_a_hero() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_image(&root.join("raw/local/goa-beach-tiny.jpg"), 150, 150, Pattern::Checker);
    let config = config::load_config(root).unwrap();

    let report = pipeline::build(root, &config, &RustBackend::new(), None).unwrap();

    let image = &report.documents.manifest.images[0];
    assert_eq!(image.quality_score, 4);
    assert_eq!(
        image.usage_classes,
        vec![photo_pipeline::types::UsageClass::Thumbnail]
    );
    let goa = &report.documents.landing.locations["goa"];
    assert!(goa.hero_images.is_empty());
    assert_eq!(goa.gallery.len(), 1);

    let quality = read_document(root, "quality-report.json");
    assert_eq!(quality["byQuality"]["low"][0], "raw/local/goa-beach-tiny.jpg");
}
