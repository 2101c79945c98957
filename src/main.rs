use clap::{Parser, Subcommand};
use photo_pipeline::classify::{Classifier, ClassifyInput};
use photo_pipeline::imaging::RustBackend;
use photo_pipeline::{config, dedup, output, pipeline, registry};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photo-pipeline")]
#[command(about = "Deduplicate, classify, and render web-ready photo derivatives")]
#[command(long_about = "\
Deduplicate, classify, and render web-ready photo derivatives

Source images are enumerated from the configured source trees (or a JSON
feed), near-duplicates are dropped by perceptual hash, the rest are scored,
classified by keyword rules, filed into category folders, and rendered in
every catalog size as WebP and AVIF.

Project structure:

  project/
  ├── config.toml                    # Optional, overrides stock defaults
  ├── raw/
  │   ├── website/                   # origin = website
  │   │   ├── goa-haldi-01.jpg
  │   │   └── goa-haldi-01.txt       # Optional context text (alt, caption)
  │   └── local/                     # origin = local
  └── assets/                        # Output root
      ├── website-ready/
      │   ├── webp/heros/<slug>.webp
      │   ├── avif/cards/<slug>.avif
      │   └── original/<slug>.jpg
      ├── by-location/goa/heroes/<slug>.jpg
      ├── by-event/haldi/<slug>.jpg
      └── metadata/                  # manifest.json, alt-texts.json, ...

Re-running a build only produces what is missing.

Run 'photo-pipeline gen-config' to generate a documented config.toml.
Set RUST_LOG=debug for per-phase diagnostics.")]
#[command(version)]
struct Cli {
    /// Project root (holds config.toml and the source trees)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: dedup → quality → classify → organize → render → documents
    Build {
        /// Stop after organizing and print the plan without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Enumerate sources and report near-duplicates
    Dedup,
    /// Classify a file name or path with the configured rules
    Classify {
        /// File name or path to classify
        text: String,
        /// Extra context text (alt text, page URL)
        #[arg(long)]
        context: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Build { dry_run } => {
            let config = config::load_config(&cli.root)?;
            init_thread_pool(&config.processing);
            let backend = RustBackend::new();

            if dry_run {
                println!("==> Planning {}", cli.root.display());
                let plan = pipeline::plan(&cli.root, &config, &backend, None)?;
                output::print_plan(&plan);
                return Ok(());
            }

            println!("==> Building {}", cli.root.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline::build(&cli.root, &config, &backend, Some(&tx));
            drop(tx);
            printer.join().unwrap();
            let report = result?;
            output::print_build_summary(&report);
        }
        Command::Dedup => {
            let config = config::load_config(&cli.root)?;
            init_thread_pool(&config.processing);
            let registry = registry::enumerate(&cli.root, &config)?;
            let mut errors = registry.errors;
            let outcome = dedup::dedup(registry.images, &RustBackend::new());
            errors.extend(outcome.errors);
            output::print_duplicates(outcome.unique.len(), &outcome.duplicates);
            for line in output::format_errors(&errors) {
                println!("{}", line);
            }
        }
        Command::Classify { text, context } => {
            let config = config::load_config(&cli.root)?;
            let seed = Path::new(&text)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| text.clone());
            let classification = Classifier::new(&config).classify(&ClassifyInput {
                path: &text,
                context: context.as_deref(),
                seed: &seed,
                colors: &[],
            });
            output::print_classification(&classification);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Config can lower the count, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
