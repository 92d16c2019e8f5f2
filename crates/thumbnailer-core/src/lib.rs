//! Core functionality for deriving thumbnail variants from uploaded images.
//!
//! This library provides the components behind the upload pipeline:
//! - A fixed table of target sizes and per-variant output directories
//! - Resizing through a pluggable `Resizer` (the `image` crate by default)
//! - Manifests carrying human-readable sizes for originals and derivatives
//! - Staging of uploads and discovery of images for batch runs

// -- External Dependencies --
use log::info;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use pipeline::ThumbnailPipeline;
pub use resize::{ImageResizer, Resizer};
pub use size::{human_readable_size, SizeReading};
pub use specs::{ThumbnailSpec, ThumbnailSpecTable};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod discovery;
pub mod logging;
pub mod pipeline;
pub mod provisioning;
pub mod resize;
pub mod size;
pub mod specs;
pub mod staging;
pub mod types;

/// Main entry point for turning uploads into thumbnail sets
pub struct Thumbnailer {
    pipeline: ThumbnailPipeline,
}

impl Thumbnailer {
    /// Create a Thumbnailer that resizes with the `image` crate
    pub fn new(config: Config) -> Result<Self> {
        Self::with_resizer(config, ImageResizer::default())
    }

    /// Create a Thumbnailer around a custom resize capability
    pub fn with_resizer<R: Resizer + 'static>(config: Config, resizer: R) -> Result<Self> {
        Ok(Self {
            pipeline: ThumbnailPipeline::new(config, resizer)?,
        })
    }

    pub fn config(&self) -> &Config {
        self.pipeline.config()
    }

    /// Derive all variants from an image in place, naming them after its basename
    pub fn process_image<P: AsRef<Path>>(&self, image_path: P) -> Result<ProcessingManifest> {
        let image_path = image_path.as_ref();
        let file_name = base_name(image_path)?;
        self.pipeline.process_image(image_path, &file_name)
    }

    /// Stage an upload into the originals directory, then derive all variants
    pub fn ingest<P: AsRef<Path>>(&self, source: P) -> Result<ProcessingManifest> {
        let source = source.as_ref();
        let original_name = base_name(source)?;
        self.ingest_as(source, &original_name)
    }

    /// Like `ingest`, for uploads whose temporary path lost the client file name
    pub fn ingest_as<P: AsRef<Path>>(
        &self,
        source: P,
        original_name: &str,
    ) -> Result<ProcessingManifest> {
        let staged = staging::stage_upload(source, original_name, self.config())?;
        self.pipeline.process_image(&staged.path, &staged.file_name)
    }

    /// Discover all images in the provided directories
    pub fn discover_images(&self, directories: &[impl AsRef<Path>]) -> Result<Vec<PathBuf>> {
        discovery::discover_images(directories, self.config().max_depth)
    }

    /// Process independent images in parallel, one result per input in input order.
    ///
    /// Images sharing a basename overwrite each other's derivatives; use
    /// `ingest_batch` when inputs come from several directories.
    pub fn process_batch(&self, images: &[PathBuf]) -> Vec<Result<ProcessingManifest>> {
        self.run_batch(images, |path| self.process_image(path))
    }

    /// Stage and process independent uploads in parallel
    pub fn ingest_batch(&self, images: &[PathBuf]) -> Vec<Result<ProcessingManifest>> {
        self.run_batch(images, |path| self.ingest(path))
    }

    fn run_batch<F>(&self, images: &[PathBuf], op: F) -> Vec<Result<ProcessingManifest>>
    where
        F: Fn(&Path) -> Result<ProcessingManifest> + Sync,
    {
        info!("Processing batch of {} images...", images.len());
        let results: Vec<_> = images.par_iter().map(|path| op(path.as_path())).collect();

        let failures = results.iter().filter(|r| r.is_err()).count();
        info!(
            "Batch complete: {} processed, {} failed",
            results.len() - failures,
            failures
        );
        results
    }
}

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
}
