//! chartedge: run the chart edge-extraction pipeline from the command line.
//!
//! Processes either an image file (upload-style) or a named template
//! located through the template resolver, and prints the artifact bundle
//! as JSON. Useful for:
//!
//! - Checking which template directory a name resolves to
//! - Tuning technique parameters before wiring them into a front end
//! - Dumping every derived image as PNG for visual inspection
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin chartedge -- [OPTIONS] [IMAGE_PATH]
//! cargo run --release --bin chartedge -- --template bar.png --all-techniques
//! ```
//!
//! Exit status is 0 on success, 2 when a template cannot be found and 1
//! for every other failure.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chartedge_io::{Outcome, ResolverConfig, ServiceError, SourceResolver};
use chartedge_pipeline::{ArtifactBundle, TechniqueConfig};
use clap::{ArgGroup, Parser};
use log::{info, warn};

/// Extract edge maps and region crops from chart images.
///
/// Without any technique option, an image path produces the baseline
/// upload bundle and a template produces the baseline template bundle.
#[derive(Parser)]
#[command(name = "chartedge", version)]
#[command(group(ArgGroup::new("techniques_source").args(["techniques_json", "techniques", "all_techniques"])))]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(required_unless_present = "template", conflicts_with = "template")]
    image_path: Option<PathBuf>,

    /// Template file name to resolve through the template directories.
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Technique configuration as a JSON object, e.g.
    /// `{"threshold": {"lower": 30, "upper": 90}}`.
    #[arg(long, value_name = "JSON")]
    techniques_json: Option<String>,

    /// Read the technique configuration JSON from a file.
    #[arg(long, value_name = "FILE")]
    techniques: Option<PathBuf>,

    /// Run every technique with default parameters.
    #[arg(long)]
    all_techniques: bool,

    /// Template directory to search, highest priority first. Replaces the
    /// configured list when given.
    #[arg(long = "template-dir", value_name = "DIR")]
    template_dirs: Vec<PathBuf>,

    /// Resolver settings JSON file (`{"template_roots": [...]}`).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the bundle JSON to this file instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also write every artifact as `<key>.png` into this directory.
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Exit status 2 for a missing template, 1 otherwise.
fn exit_status(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<ServiceError>().map(ServiceError::outcome) {
        Some(Outcome::NotFound) => 2,
        _ => 1,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let techniques = technique_config(cli)?;

    let bundle = if let Some(ref name) = cli.template {
        let resolver = resolver(cli)?;
        chartedge_io::process_template_image(&resolver, name, techniques.as_ref())?
    } else if let Some(ref path) = cli.image_path {
        process_path(path, techniques.as_ref())?
    } else {
        anyhow::bail!("either IMAGE_PATH or --template is required");
    };

    for skipped in bundle.skipped() {
        warn!("technique `{}` skipped: {}", skipped.technique, skipped.reason);
    }
    let d = bundle.dimensions();
    info!(
        "{} artifacts, working image {}x{}x{}",
        bundle.len(),
        d.width,
        d.height,
        d.channels
    );

    if let Some(ref dir) = cli.dump_dir {
        dump_artifacts(&bundle, dir)?;
    }
    write_bundle(&bundle, cli.output.as_deref())
}

/// Parse the technique configuration from whichever option was given.
fn technique_config(cli: &Cli) -> Result<Option<TechniqueConfig>> {
    if let Some(ref json) = cli.techniques_json {
        return TechniqueConfig::from_json(json)
            .map(Some)
            .context("parsing --techniques-json");
    }
    if let Some(ref path) = cli.techniques {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return TechniqueConfig::from_json(&text)
            .map(Some)
            .with_context(|| format!("parsing {}", path.display()));
    }
    Ok(cli.all_techniques.then(TechniqueConfig::all_defaults))
}

/// Build the template resolver: `--template-dir` wins over `--config`,
/// which wins over the built-in directory list.
fn resolver(cli: &Cli) -> Result<SourceResolver> {
    let config = if !cli.template_dirs.is_empty() {
        ResolverConfig {
            template_roots: cli.template_dirs.clone(),
        }
    } else if let Some(ref path) = cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        ResolverConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        ResolverConfig::default()
    };
    Ok(SourceResolver::from_config(&config))
}

/// An image path with no technique options is treated as an upload.
fn process_path(path: &Path, techniques: Option<&TechniqueConfig>) -> Result<ArtifactBundle> {
    let Some(techniques) = techniques else {
        return Ok(chartedge_io::process_image_file(path)?);
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(chartedge_pipeline::process(&bytes, techniques)?)
}

fn dump_artifacts(bundle: &ArtifactBundle, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (key, image) in bundle.iter() {
        let path = dir.join(format!("{key}.png"));
        std::fs::write(&path, image.png_bytes()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn write_bundle(bundle: &ArtifactBundle, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(bundle).context("serializing bundle")?;
    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
            info!("bundle written to {} ({} bytes)", path.display(), json.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}
