//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Processing stage of a task.
///
/// `None` is only observed before a task has been activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    None,
    /// Decode the input into a mono 16 kHz WAV.
    Extract,
    /// Run the transcription script on the WAV.
    Transcribe,
    /// Burn the subtitle into a re-encoded copy of the input.
    Embed,
}

impl Stage {
    /// 1-based position in the pipeline, `0` for `None`.
    pub fn ordinal(&self) -> u8 {
        match self {
            Stage::None => 0,
            Stage::Extract => 1,
            Stage::Transcribe => 2,
            Stage::Embed => 3,
        }
    }

    /// Whether this stage runs the media tool (and reports free-text progress).
    pub fn runs_media_tool(&self) -> bool {
        matches!(self, Stage::Extract | Stage::Embed)
    }

    /// Human readable label used in status text.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::None => "idle",
            Stage::Extract => "extracting audio",
            Stage::Transcribe => "transcribing",
            Stage::Embed => "burning subtitles",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::None => write!(f, "None"),
            Stage::Extract => write!(f, "Extract"),
            Stage::Transcribe => write!(f, "Transcribe"),
            Stage::Embed => write!(f, "Embed"),
        }
    }
}

/// Speech recognition engine understood by the transcription script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Offline CPU engine (no model sizes).
    #[default]
    Vosk,
    /// GPU engine with selectable model size.
    Whisper,
}

impl Engine {
    /// Value passed to `--engine`.
    pub fn as_arg(&self) -> &'static str {
        match self {
            Engine::Vosk => "vosk",
            Engine::Whisper => "whisper",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vosk" => Ok(Engine::Vosk),
            "whisper" => Ok(Engine::Whisper),
            other => Err(format!("unknown engine '{}' (expected vosk or whisper)", other)),
        }
    }
}

/// Model size for engines that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// Value passed to `--model`.
    pub fn as_arg(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }

    /// Get all available sizes, smallest first.
    pub fn all() -> &'static [ModelSize] {
        &[
            Self::Tiny,
            Self::Base,
            Self::Small,
            Self::Medium,
            Self::Large,
        ]
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl std::str::FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_arg() == lowered)
            .ok_or_else(|| {
                format!(
                    "unknown model '{}' (expected tiny, base, small, medium or large)",
                    s
                )
            })
    }
}

/// Reason code attached to a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Extract,
    Transcribe,
    EmptySubtitle,
    Embed,
}

impl FailureReason {
    /// Stable code reported to collaborators.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::Extract => "extract",
            FailureReason::Transcribe => "transcribe",
            FailureReason::EmptySubtitle => "empty-subtitle",
            FailureReason::Embed => "embed",
        }
    }

    /// Reason code for a non-zero exit (or failed start) of `stage`.
    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Extract => Some(FailureReason::Extract),
            Stage::Transcribe => Some(FailureReason::Transcribe),
            Stage::Embed => Some(FailureReason::Embed),
            Stage::None => None,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_pipeline() {
        assert!(Stage::Extract.ordinal() < Stage::Transcribe.ordinal());
        assert!(Stage::Transcribe.ordinal() < Stage::Embed.ordinal());
        assert!(Stage::Extract.runs_media_tool());
        assert!(!Stage::Transcribe.runs_media_tool());
    }

    #[test]
    fn engine_and_model_parse_case_insensitively() {
        assert_eq!("Whisper".parse::<Engine>().unwrap(), Engine::Whisper);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("cloud".parse::<Engine>().is_err());
        assert!("huge".parse::<ModelSize>().is_err());
    }

    #[test]
    fn failure_codes_are_stable() {
        assert_eq!(FailureReason::EmptySubtitle.code(), "empty-subtitle");
        assert_eq!(FailureReason::for_stage(Stage::Embed), Some(FailureReason::Embed));
        assert_eq!(FailureReason::for_stage(Stage::None), None);

        let json = serde_json::to_string(&FailureReason::EmptySubtitle).unwrap();
        assert_eq!(json, "\"empty-subtitle\"");
    }
}
