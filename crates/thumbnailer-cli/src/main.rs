use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use thumbnailer_core::{Config, LogLevel, ProcessingManifest, Thumbnailer};

#[derive(Parser)]
#[command(name = "thumbnailer")]
#[command(about = "Derive fixed-size thumbnail sets from images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parent directory of the per-variant output directories
    #[arg(long)]
    thumbnail_root: Option<PathBuf>,

    /// Where staged originals are stored
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Resize the variants of each image in parallel
    #[arg(long)]
    parallel: bool,

    /// Write logs to rotating files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive thumbnails from images where they are
    Process {
        /// Images to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Copy uploads into the originals directory, then derive thumbnails
    Ingest {
        /// Uploaded images
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Find images under directories and ingest them in parallel
    Scan {
        /// Directories to scan for images
        #[arg(required = true)]
        directories: Vec<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "thumbnailer.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process { files, common } => {
            let thumbnailer = setup(&common)?;
            let results = files
                .iter()
                .map(|file| thumbnailer.process_image(file))
                .collect();
            report(&files, results)
        }

        Commands::Ingest { files, common } => {
            let thumbnailer = setup(&common)?;
            let results = files.iter().map(|file| thumbnailer.ingest(file)).collect();
            report(&files, results)
        }

        Commands::Scan {
            directories,
            common,
        } => {
            let thumbnailer = setup(&common)?;

            info!("Discovering images...");
            let images = thumbnailer.discover_images(&directories)?;
            info!("Found {} images", images.len());

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} [{elapsed}] {msg}")
                    .context("invalid progress template")?,
            );
            spinner.set_message(format!("Deriving thumbnails for {} images...", images.len()));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let results = thumbnailer.ingest_batch(&images);
            spinner.finish_with_message(format!("Processed {} images", images.len()));

            report(&images, results)
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

/// Build the configuration, initialise logging and provision directories
fn setup(common: &CommonArgs) -> anyhow::Result<Thumbnailer> {
    let mut config = match &common.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Override config with command line arguments
    if let Some(root) = &common.thumbnail_root {
        config.thumbnail_root = root.clone();
    }
    if let Some(dir) = &common.upload_dir {
        config.upload_dir = dir.clone();
    }
    if common.parallel {
        config.parallel = true;
    }
    config.log_level = match common.verbose {
        0 => config.log_level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    match &common.log_dir {
        Some(dir) => thumbnailer_core::logging::init_logger(dir, config.log_level.into())
            .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?,
        None => env_logger::Builder::new()
            .filter_level(config.log_level.into())
            .parse_default_env()
            .init(),
    }

    config.validate()?;
    Ok(Thumbnailer::new(config)?)
}

/// Print manifests as JSON and fail if any image could not be processed
fn report(
    inputs: &[PathBuf],
    results: Vec<thumbnailer_core::Result<ProcessingManifest>>,
) -> anyhow::Result<()> {
    let mut manifests = Vec::new();
    let mut failures = 0;

    for (input, result) in inputs.iter().zip(results) {
        match result {
            Ok(manifest) => {
                for thumbnail in manifest.failed() {
                    warn!(
                        "{}: variant {} was not produced",
                        input.display(),
                        thumbnail.variant
                    );
                }
                manifests.push(manifest);
            }
            Err(e) => {
                error!("{}: {}", input.display(), e);
                eprintln!("{}: {}", input.display(), e);
                failures += 1;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&manifests)?);

    if failures > 0 {
        anyhow::bail!("{} of {} images failed", failures, inputs.len());
    }
    Ok(())
}
