use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

use crate::size::SizeReading;

/// Supported image formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Other(String),
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "gif" => Self::Gif,
            "webp" => Self::WebP,
            other => Self::Other(other.to_string()),
        }
    }

    /// Check if format can be decoded and re-encoded
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Whether sniffed file content agrees with this format
    pub fn matches(&self, sniffed: image::ImageFormat) -> bool {
        matches!(
            (self, sniffed),
            (Self::Jpeg, image::ImageFormat::Jpeg)
                | (Self::Png, image::ImageFormat::Png)
                | (Self::Gif, image::ImageFormat::Gif)
                | (Self::WebP, image::ImageFormat::WebP)
        )
    }
}

/// Step at which a variant failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Decoding, resampling or encoding the derivative
    Resize,

    /// Reading the size of the written derivative
    Stat,
}

/// What happened to one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOutcome {
    /// Derivative written; size read back from disk afterwards
    Produced { size: SizeReading },

    /// Derivative missing or unreadable; the rest of the call carried on
    Failed { stage: FailureStage, reason: String },
}

/// Per-variant record of a processed image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResult {
    /// Variant identifier this record is keyed by
    pub variant: String,

    /// Where the derivative is (or would have been) written
    pub path: PathBuf,

    /// Size of the original at processing time
    pub original_size: SizeReading,

    pub outcome: VariantOutcome,
}

impl ThumbnailResult {
    pub fn is_produced(&self) -> bool {
        matches!(self.outcome, VariantOutcome::Produced { .. })
    }

    /// Rendered derivative size, if one was produced
    pub fn size(&self) -> Option<&SizeReading> {
        match &self.outcome {
            VariantOutcome::Produced { size } => Some(size),
            VariantOutcome::Failed { .. } => None,
        }
    }
}

impl Serialize for ThumbnailResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ThumbnailResult", 3)?;
        state.serialize_field("path", &self.path.to_string_lossy())?;
        match &self.outcome {
            VariantOutcome::Produced { size } => {
                state.serialize_field("size", &size.rendered)?;
            }
            VariantOutcome::Failed { stage, reason } => {
                state.serialize_field("error", &format!("{:?} failed: {}", stage, reason))?;
            }
        }
        state.serialize_field("originalSize", &self.original_size.rendered)?;
        state.end()
    }
}

/// Structured result describing an original image and all its derivatives.
///
/// Serialises as `{ "original": .., "thumbnails": { "<id>": { .. } } }` with
/// thumbnails in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingManifest {
    pub original: PathBuf,
    pub thumbnails: Vec<ThumbnailResult>,
}

impl ProcessingManifest {
    pub fn get(&self, variant: &str) -> Option<&ThumbnailResult> {
        self.thumbnails.iter().find(|t| t.variant == variant)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ThumbnailResult> {
        self.thumbnails.iter().filter(|t| t.is_produced())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ThumbnailResult> {
        self.thumbnails.iter().filter(|t| !t.is_produced())
    }

    /// True when every configured variant was produced
    pub fn is_complete(&self) -> bool {
        self.thumbnails.iter().all(ThumbnailResult::is_produced)
    }
}

struct ThumbnailMap<'a>(&'a [ThumbnailResult]);

impl Serialize for ThumbnailMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for thumbnail in self.0 {
            map.serialize_entry(&thumbnail.variant, thumbnail)?;
        }
        map.end()
    }
}

impl Serialize for ProcessingManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProcessingManifest", 2)?;
        state.serialize_field("original", &self.original.to_string_lossy())?;
        state.serialize_field("thumbnails", &ThumbnailMap(&self.thumbnails))?;
        state.end()
    }
}

/// An upload copied into the originals directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedUpload {
    /// Final location of the original
    pub path: PathBuf,

    /// Content-derived file name used for every derivative
    pub file_name: String,

    /// Name the file was uploaded under
    pub original_name: String,

    pub bytes: u64,
}

// -- Tests --
