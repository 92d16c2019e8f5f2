//! Fan-out of one image over the configured thumbnail table.
//!
//! Each variant is resized, then stat'ed from disk, and recorded under its
//! identifier. Failures stay inside the variant that hit them: a failed
//! resize is recorded without a stat, and a failed stat is recorded as such,
//! while the remaining variants carry on. Only problems with the call itself
//! (missing original, unprovisioned directories, a file name that would
//! escape the variant directory) are returned as errors.
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_file_error;
use crate::provisioning::{provision_directories, verify_variant_directories};
use crate::resize::{resize_variant, ResizeOutcome, Resizer};
use crate::size::SizeReading;
use crate::specs::ThumbnailSpec;
use crate::types::{FailureStage, ProcessingManifest, ThumbnailResult, VariantOutcome};

pub struct ThumbnailPipeline {
    config: Config,
    resizer: Arc<dyn Resizer>,
    pool: Option<rayon::ThreadPool>,
}

impl ThumbnailPipeline {
    /// Validate the configuration and provision every output directory
    pub fn new<R: Resizer + 'static>(config: Config, resizer: R) -> Result<Self> {
        config.validate()?;
        provision_directories(&config)?;

        let pool = if config.parallel {
            let threads = config.effective_threads().min(config.specs.len());
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("thumbnail-{}", i))
                .build()
                .map_err(|e| Error::Configuration(format!("Failed to build thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            resizer: Arc::new(resizer),
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Derivative path for one variant: the variant directory joined with the file name
    pub fn output_path(&self, spec: &ThumbnailSpec, original_filename: &str) -> PathBuf {
        self.config.output_dir(spec).join(original_filename)
    }

    /// Derive every configured variant from `image_path`.
    ///
    /// Derivatives are named `original_filename`, so repeated calls with the
    /// same name overwrite earlier outputs.
    pub fn process_image<P: AsRef<Path>>(
        &self,
        image_path: P,
        original_filename: &str,
    ) -> Result<ProcessingManifest> {
        let image_path = image_path.as_ref();
        let start = Instant::now();

        check_file_name(original_filename)?;
        let original_size = stat_original(image_path)?;
        verify_variant_directories(&self.config)?;

        info!(
            "Processing '{}' ({}) into {} variants",
            image_path.display(),
            original_size.rendered,
            self.config.specs.len()
        );

        let specs = self.config.specs.as_slice();
        let thumbnails: Vec<ThumbnailResult> = match &self.pool {
            Some(pool) => pool.install(|| {
                specs
                    .par_iter()
                    .map(|spec| self.process_variant(image_path, original_filename, spec, &original_size))
                    .collect()
            }),
            None => specs
                .iter()
                .map(|spec| self.process_variant(image_path, original_filename, spec, &original_size))
                .collect(),
        };

        let manifest = ProcessingManifest {
            original: image_path.to_path_buf(),
            thumbnails,
        };

        let failed = manifest.failed().count();
        if failed > 0 {
            warn!(
                "Processed '{}' with {} of {} variants failed in {:.2?}",
                image_path.display(),
                failed,
                manifest.thumbnails.len(),
                start.elapsed()
            );
        } else {
            info!(
                "Processed '{}' in {:.2?}",
                image_path.display(),
                start.elapsed()
            );
        }

        Ok(manifest)
    }

    fn process_variant(
        &self,
        image_path: &Path,
        original_filename: &str,
        spec: &ThumbnailSpec,
        original_size: &SizeReading,
    ) -> ThumbnailResult {
        let path = self.output_path(spec, original_filename);

        let outcome = match resize_variant(self.resizer.as_ref(), image_path, &path, spec) {
            ResizeOutcome::Failed(reason) => VariantOutcome::Failed {
                stage: FailureStage::Resize,
                reason,
            },
            ResizeOutcome::Written => match SizeReading::of_file(&path) {
                Ok(size) => VariantOutcome::Produced { size },
                Err(e) => {
                    log_file_error(&path, "stat", &e);
                    VariantOutcome::Failed {
                        stage: FailureStage::Stat,
                        reason: e.to_string(),
                    }
                }
            },
        };

        ThumbnailResult {
            variant: spec.id.clone(),
            path,
            original_size: original_size.clone(),
            outcome,
        }
    }
}

/// Derivative names must stay inside their variant directory
fn check_file_name(name: &str) -> Result<()> {
    let escapes = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if escapes {
        return Err(Error::Configuration(format!(
            "'{}' is not a plain file name",
            name
        )));
    }
    Ok(())
}

fn stat_original(path: &Path) -> Result<SizeReading> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    SizeReading::of_file(path).map_err(|source| {
        log_file_error(path, "stat", &source);
        Error::Stat {
            path: path.to_path_buf(),
            source,
        }
    })
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::ThumbnailSpecTable;
    use tempfile::tempdir;

    /// Writes `width` bytes per variant instead of decoding anything
    struct FakeResizer {
        fail_width: Option<u32>,
    }

    impl Resizer for FakeResizer {
        fn resize(&self, _input: &Path, output: &Path, width: u32, _height: u32) -> Result<()> {
            if Some(width) == self.fail_width {
                return Err(Error::UnsupportedFormat("forced".to_string()));
            }
            std::fs::write(output, vec![0u8; width as usize])?;
            Ok(())
        }
    }

    fn fake(fail_width: Option<u32>) -> FakeResizer {
        FakeResizer { fail_width }
    }

    fn config_in(root: &Path) -> Config {
        Config {
            upload_dir: root.join("originals"),
            thumbnail_root: root.join("thumbs"),
            ..Config::default()
        }
    }

    fn original_in(root: &Path) -> PathBuf {
        let path = root.join("source.png");
        std::fs::write(&path, vec![1u8; 1500]).unwrap();
        path
    }

    #[test]
    fn test_sizes_are_read_back_from_disk() {
        let dir = tempdir().unwrap();
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), fake(None)).unwrap();
        let original = original_in(dir.path());

        let manifest = pipeline.process_image(&original, "cat.png").unwrap();

        assert_eq!(manifest.original, original);
        assert_eq!(manifest.thumbnails.len(), 6);
        assert!(manifest.is_complete());

        let small = manifest.get("50x50").unwrap();
        assert_eq!(small.path, dir.path().join("thumbs/50x50/cat.png"));
        assert_eq!(small.size().unwrap().rendered, "50 B");
        assert_eq!(small.original_size.rendered, "1.5 KB");

        let large = manifest.get("2000x2000").unwrap();
        assert_eq!(large.size().unwrap().rendered, "2.0 KB");
    }

    #[test]
    fn test_failed_resize_is_isolated() {
        let dir = tempdir().unwrap();
        let resizer = fake(Some(250));
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), resizer).unwrap();
        let original = original_in(dir.path());

        let manifest = pipeline.process_image(&original, "cat.png").unwrap();

        assert_eq!(manifest.thumbnails.len(), 6);
        assert_eq!(manifest.succeeded().count(), 5);
        let failed: Vec<_> = manifest.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].variant, "250x250");
        assert!(matches!(
            failed[0].outcome,
            VariantOutcome::Failed {
                stage: FailureStage::Resize,
                ..
            }
        ));
    }

    #[test]
    fn test_parallel_matches_table_order() {
        let dir = tempdir().unwrap();
        let config = Config {
            parallel: true,
            threads: 4,
            ..config_in(dir.path())
        };
        let pipeline = ThumbnailPipeline::new(config, fake(Some(1000))).unwrap();
        let original = original_in(dir.path());

        let manifest = pipeline.process_image(&original, "cat.png").unwrap();

        let ids: Vec<&str> = manifest.thumbnails.iter().map(|t| t.variant.as_str()).collect();
        assert_eq!(
            ids,
            vec!["50x50", "150x150", "250x250", "500x500", "1000x1000", "2000x2000"]
        );
        assert!(!manifest.get("1000x1000").unwrap().is_produced());
        assert_eq!(manifest.succeeded().count(), 5);
    }

    #[test]
    fn test_alternate_table() {
        let dir = tempdir().unwrap();
        let config = Config {
            specs: ThumbnailSpecTable::new(vec![ThumbnailSpec::new(32, 16)]),
            ..config_in(dir.path())
        };
        let pipeline = ThumbnailPipeline::new(config, fake(None)).unwrap();
        let original = original_in(dir.path());

        let manifest = pipeline.process_image(&original, "x.png").unwrap();
        assert_eq!(manifest.thumbnails.len(), 1);
        assert_eq!(manifest.thumbnails[0].variant, "32x16");
    }

    #[test]
    fn test_missing_original() {
        let dir = tempdir().unwrap();
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), fake(None)).unwrap();

        let result = pipeline.process_image(dir.path().join("nope.png"), "nope.png");
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempdir().unwrap();
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), fake(None)).unwrap();
        let original = original_in(dir.path());

        for name in ["", "..", "../escape.png", "a/b.png", "a\\b.png"] {
            let result = pipeline.process_image(&original, name);
            assert!(matches!(result, Err(Error::Configuration(_))), "{}", name);
        }
    }

    #[test]
    fn test_unprovisioned_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let resizer = fake(None);
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), resizer).unwrap();
        let original = original_in(dir.path());

        std::fs::remove_dir(dir.path().join("thumbs/500x500")).unwrap();

        let result = pipeline.process_image(&original, "cat.png");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_in_place_processing_without_originals_dir() {
        let dir = tempdir().unwrap();
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), fake(None)).unwrap();
        let original = original_in(dir.path());

        std::fs::remove_dir(dir.path().join("originals")).unwrap();

        let manifest = pipeline.process_image(&original, "cat.png").unwrap();
        assert!(manifest.is_complete());
    }

    /// Reports success without writing anything
    struct NoWriteResizer;

    impl Resizer for NoWriteResizer {
        fn resize(&self, _input: &Path, _output: &Path, _width: u32, _height: u32) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_output_after_resize_is_a_stat_failure() {
        let dir = tempdir().unwrap();
        let pipeline = ThumbnailPipeline::new(config_in(dir.path()), NoWriteResizer).unwrap();
        let original = original_in(dir.path());

        let manifest = pipeline.process_image(&original, "cat.png").unwrap();

        assert_eq!(manifest.thumbnails.len(), 6);
        for thumbnail in &manifest.thumbnails {
            assert!(
                matches!(
                    thumbnail.outcome,
                    VariantOutcome::Failed {
                        stage: FailureStage::Stat,
                        ..
                    }
                ),
                "{:?}",
                thumbnail
            );
            assert!(!thumbnail.path.exists());
        }

        let json = serde_json::to_value(&manifest).unwrap();
        let entry = &json["thumbnails"]["50x50"];
        assert_eq!(
            entry["path"],
            dir.path().join("thumbs/50x50/cat.png").to_string_lossy().as_ref()
        );
        assert_eq!(entry["originalSize"], "1.5 KB");
        assert!(entry["error"].as_str().unwrap().starts_with("Stat failed"));
        assert!(entry.get("size").is_none());
    }
}
