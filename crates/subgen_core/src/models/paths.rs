//! Paths derived from a task's input file and output directory.

use std::path::{Path, PathBuf};

/// Suffix appended to the base name of the final video.
pub const OUTPUT_SUFFIX: &str = "_subtitled";

/// File name of the subtitle copy handed to the burn-in filter.
///
/// Kept free of spaces, quotes and colons so it can be referenced from the
/// filter graph without escaping.
pub const RENDER_SUBTITLE_NAME: &str = "temp_render_subs.srt";

const TEMP_AUDIO_SUFFIX: &str = "_temp_audio.wav";

/// Every path a task reads or writes.
///
/// Computed deterministically from the input path and output directory, so
/// re-running the same input always targets the same files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPaths {
    /// Source video.
    pub input: PathBuf,
    /// Directory receiving the subtitle and the final video.
    pub target_dir: PathBuf,
    /// Extracted mono 16 kHz WAV, next to the input.
    pub temp_audio: PathBuf,
    /// Generated SubRip subtitle (a deliverable).
    pub subtitle: PathBuf,
    /// Render-time copy of the subtitle inside `target_dir`.
    pub render_subtitle: PathBuf,
    /// Final video with burned-in subtitles.
    pub output_video: PathBuf,
}

impl TaskPaths {
    /// Derive paths for `input`. An empty `output_dir` means "beside the input".
    ///
    /// Relative paths are resolved against the current directory, since the
    /// embed step runs with `target_dir` as its working directory.
    pub fn derive(input: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        let input = absolute(input.as_ref());
        let source_dir = input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let output_dir = output_dir.as_ref();
        let target_dir = if output_dir.as_os_str().is_empty() {
            source_dir.clone()
        } else {
            absolute(output_dir)
        };

        let base = base_name(&input);
        let output_name = match input.extension() {
            Some(ext) => format!("{}{}.{}", base, OUTPUT_SUFFIX, ext.to_string_lossy()),
            None => format!("{}{}", base, OUTPUT_SUFFIX),
        };

        Self {
            temp_audio: source_dir.join(format!("{}{}", base, TEMP_AUDIO_SUFFIX)),
            subtitle: target_dir.join(format!("{}.srt", base)),
            render_subtitle: target_dir.join(RENDER_SUBTITLE_NAME),
            output_video: target_dir.join(output_name),
            target_dir,
            input,
        }
    }

    /// File name without its final extension.
    pub fn base_name(&self) -> String {
        base_name(&self.input)
    }

    /// Intermediate files that never survive a terminal outcome.
    pub fn temporaries(&self) -> [&Path; 2] {
        [&self.temp_audio, &self.render_subtitle]
    }

    /// Everything a previous run could have left at this task's paths.
    pub fn stale_candidates(&self) -> [&Path; 4] {
        [
            &self.temp_audio,
            &self.subtitle,
            &self.render_subtitle,
            &self.output_video,
        ]
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
