//! Persisting uploaded originals under content-derived names.
//!
//! Uploads are checked for size, extension and sniffed content before being
//! copied into the originals directory as `<blake3 prefix>.<ext>`. Identical
//! bytes therefore always land on the same path.
use blake3::Hash as Blake3Hash;
use log::{debug, info};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::log_fs_modification;
use crate::types::{ImageFormat, StagedUpload};

/// Hex characters of the content hash kept in staged file names
const NAME_HASH_LEN: usize = 16;

/// Bytes read for content sniffing
const SNIFF_LEN: usize = 64;

static PARTIAL_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Compute the BLAKE3 hash of a file's contents
pub fn content_hash<P: AsRef<Path>>(path: P) -> Result<Blake3Hash> {
    let mut file = File::open(&path)?;
    let mut hasher = blake3::Hasher::new();

    // Read the file in chunks and update the hasher
    let mut buffer = [0; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Validate an upload and copy it into `config.upload_dir`
pub fn stage_upload<P: AsRef<Path>>(
    source: P,
    original_name: &str,
    config: &Config,
) -> Result<StagedUpload> {
    let source = source.as_ref();
    if !source.is_file() {
        return Err(Error::FileNotFound(source.to_path_buf()));
    }

    let bytes = fs::metadata(source)?.len();
    if bytes == 0 {
        return Err(Error::Rejected(format!("{} is empty", original_name)));
    }
    if bytes > config.max_upload_bytes {
        return Err(Error::Rejected(format!(
            "{} is {} bytes, limit is {}",
            original_name, bytes, config.max_upload_bytes
        )));
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let format = ImageFormat::from_extension(&ext);
    if !format.is_supported() {
        return Err(Error::Rejected(format!(
            "{} does not have a supported image extension",
            original_name
        )));
    }

    let mut header = Vec::with_capacity(SNIFF_LEN);
    File::open(source)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut header)?;
    match image::guess_format(&header) {
        Ok(sniffed) if format.matches(sniffed) => {}
        Ok(sniffed) => {
            return Err(Error::Rejected(format!(
                "{} contains {:?} data",
                original_name, sniffed
            )))
        }
        Err(_) => {
            return Err(Error::Rejected(format!(
                "{} is not a recognised image",
                original_name
            )))
        }
    }

    let hash = content_hash(source)?.to_hex().to_string();
    let file_name = format!("{}.{}", &hash[..NAME_HASH_LEN], ext);
    let path = config.upload_dir.join(&file_name);

    // Content-addressed: an existing file already holds these bytes
    if path.exists() {
        debug!("'{}' already staged as '{}'", original_name, file_name);
    } else {
        fs::create_dir_all(&config.upload_dir)?;
        // Copy beside the target and rename, so readers never see a partial file
        let partial = config.upload_dir.join(format!(
            ".{}.{}-{}.part",
            file_name,
            std::process::id(),
            PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = fs::copy(source, &partial).and_then(|_| fs::rename(&partial, &path)) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        log_fs_modification("stage_upload", &path, Some(original_name));
    }
    info!("Staged '{}' as '{}'", original_name, file_name);

    Ok(StagedUpload {
        path,
        file_name,
        original_name: original_name.to_string(),
        bytes,
    })
}

// -- Tests --
