//! Output stream parsing.
//!
//! The pipeline talks to two kinds of tools with different protocols:
//!
//! - The transcription script prints structured markers on stdout
//!   (`DOWNLOAD_PROGRESS: 45`, `TRANS_PROGRESS: 50`) one per line.
//! - ffmpeg prints free text on stderr, using carriage returns to redraw
//!   its status line (`Duration: 00:01:02.50`, `time=00:00:31.25`).
//!
//! Both parsers are plain functions of `(stage, line)` so they can be
//! tested without spawning anything. [`LineAssembler`] turns raw chunks into
//! complete lines before either parser sees them.

mod lines;
mod markers;
mod media;

pub use lines::LineAssembler;
pub use markers::{parse_transcriber_line, transcribe_overall, TranscriberLine};
pub use media::{
    is_notable, is_spinner, media_overall, parse_media_line, parse_timestamp, MediaLine,
    MediaProgress,
};

/// Progress expressed both for the whole task and for the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Position of the overall bar, 0-100.
    pub overall: u8,
    /// Completion of the current stage, 0-100.
    pub stage_percent: u8,
}
