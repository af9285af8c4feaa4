//! Inspection of generated subtitle files.
//!
//! The pipeline never edits subtitles; it only needs to know whether the
//! transcriber produced something worth burning in.

mod srt;

pub use srt::{count_srt_entries, parse_srt_time};

use std::fs;
use std::path::Path;

/// What was found at a subtitle path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleStatus {
    /// No file.
    Missing,
    /// A zero-length file.
    Empty,
    /// A non-empty file with this many well-formed SubRip entries.
    ///
    /// `entries` may be 0 for content the scanner does not recognise; the
    /// file is still handed to the burn-in step.
    Present { entries: usize },
}

impl SubtitleStatus {
    /// Whether the file can be burned in.
    pub fn is_usable(&self) -> bool {
        matches!(self, SubtitleStatus::Present { .. })
    }
}

/// Inspect the subtitle at `path`.
pub fn inspect_subtitle(path: &Path) -> SubtitleStatus {
    let len = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return SubtitleStatus::Missing,
    };

    if len == 0 {
        return SubtitleStatus::Empty;
    }

    let entries = match fs::read(path) {
        Ok(bytes) => count_srt_entries(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::debug!("Could not read {} for inspection: {}", path.display(), e);
            0
        }
    };

    SubtitleStatus::Present { entries }
}
