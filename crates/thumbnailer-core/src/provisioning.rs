use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};

/// Every directory the pipeline writes into: originals first, then one per variant
pub fn required_directories(config: &Config) -> Vec<PathBuf> {
    std::iter::once(config.upload_dir.clone())
        .chain(config.specs.iter().map(|spec| config.output_dir(spec)))
        .collect()
}

/// Create the originals directory and every variant directory.
///
/// Returns the directories that did not exist before.
pub fn provision_directories(config: &Config) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    for dir in required_directories(config) {
        if dir.is_dir() {
            continue;
        }
        if let Err(e) = fs::create_dir_all(&dir) {
            log_file_error(&dir, "create_dir_all", &e);
            return Err(e.into());
        }
        log_fs_modification("create_dir", &dir, None);
        created.push(dir);
    }

    Ok(created)
}

/// Fail if any required directory is missing
pub fn verify_directories(config: &Config) -> Result<()> {
    first_missing(required_directories(config))
}

/// Fail if any variant output directory is missing; the originals directory is not checked
pub fn verify_variant_directories(config: &Config) -> Result<()> {
    first_missing(config.specs.iter().map(|spec| config.output_dir(spec)))
}

fn first_missing<I: IntoIterator<Item = PathBuf>>(dirs: I) -> Result<()> {
    match dirs.into_iter().find(|dir| !dir.is_dir()) {
        Some(missing) => Err(Error::Configuration(format!(
            "output directory {} has not been provisioned",
            missing.display()
        ))),
        None => Ok(()),
    }
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(root: &std::path::Path) -> Config {
        Config {
            upload_dir: root.join("originals"),
            thumbnail_root: root.join("thumbs"),
            ..Config::default()
        }
    }

    #[test]
    fn test_provision_creates_all() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        let created = provision_directories(&config).unwrap();
        assert_eq!(created.len(), 7);
        assert!(dir.path().join("originals").is_dir());
        for edge in crate::specs::STANDARD_SIZES {
            assert!(dir.path().join("thumbs").join(format!("{0}x{0}", edge)).is_dir());
        }
        assert!(verify_directories(&config).is_ok());
    }

    #[test]
    fn test_provision_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());

        provision_directories(&config).unwrap();
        let created = provision_directories(&config).unwrap();
        assert!(created.is_empty());
    }

    #[test]
    fn test_verify_reports_missing() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        provision_directories(&config).unwrap();

        fs::remove_dir(dir.path().join("thumbs").join("150x150")).unwrap();

        match verify_directories(&config) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("150x150")),
            other => panic!("expected configuration error, got {:?}", other),
        }
        match verify_variant_directories(&config) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("150x150")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_variant_check_ignores_originals_dir() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        provision_directories(&config).unwrap();

        fs::remove_dir(dir.path().join("originals")).unwrap();

        assert!(verify_directories(&config).is_err());
        assert!(verify_variant_directories(&config).is_ok());
    }
}
