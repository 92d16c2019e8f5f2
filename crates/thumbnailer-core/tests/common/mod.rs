#![allow(dead_code)]
use image::{DynamicImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use thumbnailer_core::{Config, Error, Resizer, Result};

/// Write a synthetic gradient image; the format follows the extension
pub fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x ^ y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img).save(&path).unwrap();
    path
}

/// Config rooted in a temporary directory
pub fn config_in(root: &Path) -> Config {
    Config {
        upload_dir: root.join("originals"),
        thumbnail_root: root.join("thumbnails"),
        ..Config::default()
    }
}

/// Delegates to a real resizer except for one target width
pub struct FailingResizer<R> {
    pub inner: R,
    pub fail_width: u32,
}

impl<R: Resizer> Resizer for FailingResizer<R> {
    fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
        if width == self.fail_width {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "forced failure",
            )));
        }
        self.inner.resize(input, output, width, height)
    }
}
