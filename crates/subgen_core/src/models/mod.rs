//! Data models for subgen.
//!
//! This module contains the small value types shared by every layer:
//! - Pipeline stages and the reason codes of failed tasks
//! - Transcription engine and model selection
//! - Paths derived from a task's input file

mod enums;
mod paths;

pub use enums::{Engine, FailureReason, ModelSize, Stage};
pub use paths::{TaskPaths, OUTPUT_SUFFIX, RENDER_SUBTITLE_NAME};
