use image::imageops::FilterType;
use log::{debug, warn};
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::logging::log_file_error;
use crate::specs::ThumbnailSpec;
use crate::types::ImageFormat;

/// Produces one resized file on disk from a source image
pub trait Resizer: Send + Sync {
    /// Write `input` resized to exactly `width` x `height` at `output`.
    ///
    /// The output directory must already exist.
    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()>;
}

/// Resizer backed by the `image` crate.
///
/// Scales to cover the target box and center-crops the overflow, so every
/// derivative has exactly the requested dimensions. The output encoding
/// follows the output file's extension.
#[derive(Debug, Clone, Copy)]
pub struct ImageResizer {
    filter: FilterType,
}

impl ImageResizer {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new(FilterType::Lanczos3)
    }
}

impl Resizer for ImageResizer {
    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if !ImageFormat::from_extension(ext).is_supported() {
            return Err(Error::UnsupportedFormat(format!(
                "cannot encode {}",
                output.display()
            )));
        }

        let img = image::open(input)?;
        let resized = img.resize_to_fill(width, height, self.filter);
        resized.save(output)?;
        Ok(())
    }
}

/// Result of a single variant's resize step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Written,
    Failed(String),
}

/// Run one variant's resize, logging and capturing any failure as a value
pub fn resize_variant(
    resizer: &dyn Resizer,
    input: &Path,
    output: &Path,
    spec: &ThumbnailSpec,
) -> ResizeOutcome {
    let start = Instant::now();

    match resizer.resize(input, output, spec.width, spec.height) {
        Ok(()) => {
            debug!(
                "Wrote {} variant '{}' in {:.2?}",
                spec.id,
                output.display(),
                start.elapsed()
            );
            ResizeOutcome::Written
        }
        Err(e) => {
            log_file_error(output, &format!("resize {}", spec.id), &e);
            warn!("Skipping {} variant of '{}'", spec.id, input.display());
            ResizeOutcome::Failed(e.to_string())
        }
    }
}

// -- Tests --
