//! Human-readable rendering of byte counts.
//!
//! Values are divided by 1024 until they drop below 1024 or the unit ladder
//! runs out. Raw byte counts and values of ten or more are rendered without
//! decimals; anything smaller that was divided at least once keeps exactly
//! one decimal place, so `1500` renders as `1.5 KB` while `10_485_760`
//! renders as `10 MB`.
use serde::{Deserialize, Serialize};
use std::path::Path;

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Render a byte count as a human-readable magnitude string
pub fn human_readable_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut magnitude = 0;

    while value >= 1024.0 && magnitude < UNITS.len() - 1 {
        value /= 1024.0;
        magnitude += 1;
    }

    let decimals = if magnitude == 0 || value >= 10.0 { 0 } else { 1 };

    // Round half away from zero before formatting; `format!` alone rounds ties to even
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;

    format!(
        "{:.*} {}",
        decimals as usize,
        rounded,
        UNITS[magnitude]
    )
}

/// A byte count paired with its rendered form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReading {
    pub bytes: u64,
    pub rendered: String,
}

impl SizeReading {
    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            bytes,
            rendered: human_readable_size(bytes),
        }
    }

    /// Stat a file on disk and render its current length
    pub fn of_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path.as_ref())?;
        Ok(Self::from_bytes(metadata.len()))
    }
}

// -- Tests --
