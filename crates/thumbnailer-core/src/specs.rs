use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Edge lengths of the standard square thumbnail variants, smallest first
pub const STANDARD_SIZES: [u32; 6] = [50, 150, 250, 500, 1000, 2000];

/// One configured target thumbnail size
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailSpec {
    /// Variant identifier, e.g. "150x150"
    pub id: String,

    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,

    /// Output directory override; defaults to `<thumbnail_root>/<id>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: format!("{}x{}", width, height),
            width,
            height,
            directory: None,
        }
    }

    pub fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }

    /// Write this variant's derivatives to a fixed directory
    pub fn with_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Directory holding this variant's derivatives
    pub fn output_dir(&self, thumbnail_root: &Path) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.clone(),
            None => thumbnail_root.join(&self.id),
        }
    }
}

/// Ordered, immutable set of thumbnail variants.
///
/// Manifests mirror the table order, so iteration always follows insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThumbnailSpecTable {
    specs: Vec<ThumbnailSpec>,
}

impl ThumbnailSpecTable {
    pub fn new(specs: Vec<ThumbnailSpec>) -> Self {
        Self { specs }
    }

    /// The six square variants from 50x50 up to 2000x2000
    pub fn standard() -> Self {
        Self::new(STANDARD_SIZES.iter().map(|&edge| ThumbnailSpec::square(edge)).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ThumbnailSpec> {
        self.specs.iter()
    }

    pub fn as_slice(&self) -> &[ThumbnailSpec] {
        &self.specs
    }

    pub fn get(&self, id: &str) -> Option<&ThumbnailSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ThumbnailSpecTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a ThumbnailSpecTable {
    type Item = &'a ThumbnailSpec;
    type IntoIter = std::slice::Iter<'a, ThumbnailSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

// -- Tests --
