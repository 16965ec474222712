//! Frame capture module
//!
//! Writes still frames to disk as `{video_stem}_{NNNN}.{ext}`. The sequence
//! number is always one past the highest number already on disk for that
//! stem and extension, so gaps left by deleted files are never reused.

use std::io;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};

use crate::config::ImageFormat;
use crate::error::{Error, Result};

/// Highest existing sequence number plus one (1 when there are none)
///
/// Counts files named `{stem}_*.{ext}` whose text after the last underscore
/// is an integer. A missing directory counts as empty. Fails once the
/// highest number is `u32::MAX`.
pub fn next_sequence_number(dir: &Path, stem: &str, ext: &str) -> io::Result<u32> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(e),
    };

    let prefix = format!("{stem}_");
    let suffix = format!(".{ext}");
    let mut max = 0u32;

    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(&prefix) || !name.ends_with(&suffix) {
            continue;
        }
        let file_stem = &name[..name.len() - suffix.len()];
        let Some((_, number)) = file_stem.rsplit_once('_') else {
            continue;
        };
        if let Ok(number) = number.parse::<u32>() {
            max = max.max(number);
        }
    }

    max.checked_add(1).ok_or_else(|| {
        io::Error::other(format!("capture numbering for {stem}_*.{ext} is exhausted"))
    })
}

/// Path the next capture of `stem` will be written to
pub fn next_capture_path(dir: &Path, stem: &str, format: ImageFormat) -> io::Result<PathBuf> {
    let ext = format.extension();
    let number = next_sequence_number(dir, stem, ext)?;
    Ok(dir.join(format!("{stem}_{number:04}.{ext}")))
}

/// Write a frame into `dir`, creating the directory on first use
pub fn save_frame(frame: &RgbImage, dir: &Path, stem: &str, format: ImageFormat) -> Result<PathBuf> {
    let encode_err = |path: &Path, e: io::Error| Error::Encode {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(e),
    };

    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| encode_err(dir, e))?;
        debug!("Created output directory {}", dir.display());
    }

    let path = next_capture_path(dir, stem, format).map_err(|e| encode_err(dir, e))?;

    frame
        .save_with_format(&path, format.encoder_format())
        .map_err(|source| Error::Encode {
            path: path.clone(),
            source,
        })?;

    info!("Saved frame: {}", path.display());
    Ok(path)
}
