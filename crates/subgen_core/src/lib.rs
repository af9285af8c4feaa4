//! subgen core - queued subtitle generation for video files.
//!
//! Each queued video goes through three external tools: ffmpeg extracts
//! the audio, a transcription script writes a SubRip file, and ffmpeg burns
//! that file into a re-encoded copy of the video. This crate owns the queue,
//! the process supervision, the output parsing and the file handling; it
//! has no UI dependencies.

pub mod config;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod runner;
pub mod subtitles;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
