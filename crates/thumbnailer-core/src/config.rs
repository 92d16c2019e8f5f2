use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::specs::{ThumbnailSpec, ThumbnailSpecTable};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for the thumbnail pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where staged originals are stored
    pub upload_dir: PathBuf,

    /// Parent of the per-variant output directories
    pub thumbnail_root: PathBuf,

    /// Variants derived from every image
    pub specs: ThumbnailSpecTable,

    /// Whether to resize the variants of one image in parallel
    pub parallel: bool,

    /// Number of threads to use for processing (0 = auto)
    pub threads: usize,

    /// Largest upload accepted by staging
    pub max_upload_bytes: u64,

    /// Maximum directory depth for batch scanning
    pub max_depth: Option<usize>,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads/originals"),
            thumbnail_root: PathBuf::from("uploads/thumbnails"),
            specs: ThumbnailSpecTable::standard(),
            parallel: false,
            threads: 0, // Auto
            max_upload_bytes: 20 * 1024 * 1024,
            max_depth: None,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write this configuration as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Directory a variant's derivatives are written to
    pub fn output_dir(&self, spec: &ThumbnailSpec) -> PathBuf {
        spec.output_dir(&self.thumbnail_root)
    }

    /// Threads to give a rayon pool
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Reject configurations that would produce wrong or colliding paths
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(Error::Configuration(
                "at least one thumbnail spec is required".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(Error::Configuration(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut dirs = HashSet::new();
        for spec in &self.specs {
            if spec.id.is_empty() {
                return Err(Error::Configuration(
                    "thumbnail spec identifier is empty".to_string(),
                ));
            }
            if spec.width == 0 || spec.height == 0 {
                return Err(Error::Configuration(format!(
                    "thumbnail spec {} has a zero dimension",
                    spec.id
                )));
            }
            if !ids.insert(spec.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate thumbnail spec {}",
                    spec.id
                )));
            }
            let dir = self.output_dir(spec);
            if !dirs.insert(dir.clone()) {
                return Err(Error::Configuration(format!(
                    "thumbnail spec {} shares output directory {}",
                    spec.id,
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

// -- Tests --
