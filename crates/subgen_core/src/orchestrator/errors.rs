//! Error types for the pipeline.
//!
//! Task errors are never fatal to the controller: they end one task and the
//! queue moves on.

use thiserror::Error;

use crate::models::{FailureReason, Stage};
use crate::runner::ExitInfo;

/// Why a task ended without producing its video.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A stage's program could not be launched.
    #[error("{stage} could not start: {message}")]
    StartFailure { stage: Stage, message: String },

    #[error("audio extraction failed ({exit})")]
    ExtractFailure { exit: ExitInfo },

    #[error("transcription failed ({exit})")]
    TranscribeFailure { exit: ExitInfo },

    /// The transcriber exited cleanly but wrote nothing.
    #[error("transcription produced a missing or empty subtitle")]
    EmptySubtitleFailure,

    #[error("subtitle burn-in failed ({exit})")]
    EmbedFailure { exit: ExitInfo },
}

impl TaskError {
    /// Create a start failure for `stage`.
    pub fn start_failure(stage: Stage, message: impl Into<String>) -> Self {
        Self::StartFailure {
            stage,
            message: message.into(),
        }
    }

    /// Failure of `stage` after its process exited unsuccessfully.
    pub fn stage_failed(stage: Stage, exit: ExitInfo) -> Self {
        match stage {
            Stage::Transcribe => Self::TranscribeFailure { exit },
            Stage::Embed => Self::EmbedFailure { exit },
            Stage::Extract | Stage::None => Self::ExtractFailure { exit },
        }
    }

    /// Reason code reported to collaborators.
    ///
    /// Start failures carry the code of the stage that could not start.
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::StartFailure { stage, .. } => {
                FailureReason::for_stage(*stage).unwrap_or(FailureReason::Extract)
            }
            Self::ExtractFailure { .. } => FailureReason::Extract,
            Self::TranscribeFailure { .. } => FailureReason::Transcribe,
            Self::EmptySubtitleFailure => FailureReason::EmptySubtitle,
            Self::EmbedFailure { .. } => FailureReason::Embed,
        }
    }
}

/// Errors from talking to a controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The controller loop has exited.
    #[error("pipeline controller is no longer running")]
    Closed,
}

/// Result type for controller handle operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_failures_use_stage_reason() {
        let err = TaskError::start_failure(Stage::Transcribe, "script not found");
        assert_eq!(err.reason(), FailureReason::Transcribe);
        assert!(err.to_string().contains("Transcribe could not start"));

        let err = TaskError::start_failure(Stage::Embed, "copy failed");
        assert_eq!(err.reason(), FailureReason::Embed);
    }

    #[test]
    fn exit_failures_display_code() {
        let err = TaskError::stage_failed(Stage::Extract, ExitInfo::normal(1));
        assert_eq!(err.reason(), FailureReason::Extract);
        assert_eq!(err.to_string(), "audio extraction failed (exit code 1)");

        let err = TaskError::stage_failed(Stage::Embed, ExitInfo::crashed());
        assert_eq!(err.to_string(), "subtitle burn-in failed (crashed)");
    }
}
