use log::warn;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::ImageFormat;

/// Discover images in the provided directories, sorted by path
pub fn discover_images<P: AsRef<Path>>(
    directories: &[P],
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = directories
        .iter()
        .map(|dir| dir.as_ref().to_path_buf())
        .collect();

    let mut images = paths
        .par_iter()
        .map(|dir| discover_images_in_directory(dir, max_depth))
        .collect::<Vec<Result<Vec<PathBuf>>>>()
        .into_iter()
        .try_fold(Vec::new(), |mut acc, result| {
            acc.extend(result?);
            Ok::<_, Error>(acc)
        })?;

    images.sort();
    images.dedup();
    Ok(images)
}

/// Discover images in a single directory
pub fn discover_images_in_directory(
    directory: &Path,
    max_depth: Option<usize>,
) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::FileNotFound(directory.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(directory).max_depth(max_depth.unwrap_or(usize::MAX)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", directory.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_image_path(entry.path()) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

/// Returns if the given path has a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ImageFormat::from_extension(ext).is_supported())
        .unwrap_or(false)
}

// -- Tests --
