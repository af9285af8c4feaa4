//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{Engine, ModelSize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Output and log locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Engine and model passed to the transcription script.
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Per-task log behaviour.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Process runner timeouts.
    #[serde(default)]
    pub runner: RunnerSettings,
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for subtitles and videos. Empty = beside each input.
    #[serde(default)]
    pub output_folder: String,

    /// Folder for per-task log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Write a log file per task.
    #[serde(default = "default_true")]
    pub task_logs: bool,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            logs_folder: default_logs_folder(),
            task_logs: true,
        }
    }
}

impl PathSettings {
    /// Output folder as a path (empty when unset).
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_folder)
    }

    /// Logs folder, or `None` when per-task logs are disabled.
    pub fn task_log_dir(&self) -> Option<PathBuf> {
        if self.task_logs && !self.logs_folder.is_empty() {
            Some(PathBuf::from(&self.logs_folder))
        } else {
            None
        }
    }
}

/// Locations of the external programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Interpreter that runs the transcription script.
    #[serde(default = "default_python")]
    pub python: String,

    /// Transcription script. Empty = look next to the executable.
    #[serde(default)]
    pub transcribe_script: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            python: default_python(),
            transcribe_script: String::new(),
        }
    }
}

/// Transcription parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Recognition engine.
    #[serde(default)]
    pub engine: Engine,

    /// Model size (ignored by vosk).
    #[serde(default)]
    pub model: ModelSize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to task logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (filter progress lines).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines kept for failure diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with a wall-clock timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
        }
    }
}

/// Process runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Bounded wait after killing a process, in milliseconds.
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout_ms: u64,

    /// Bounded wait for output pipes to close after the process exits.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,
}

fn default_kill_timeout() -> u64 {
    2000
}

fn default_drain_timeout() -> u64 {
    2000
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            kill_timeout_ms: default_kill_timeout(),
            drain_timeout_ms: default_drain_timeout(),
        }
    }
}

impl RunnerSettings {
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Tools,
    Transcription,
    Logging,
    Runner,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Transcription => "transcription",
            ConfigSection::Logging => "logging",
            ConfigSection::Runner => "runner",
        }
    }

    /// All sections in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            Self::Paths,
            Self::Tools,
            Self::Transcription,
            Self::Logging,
            Self::Runner,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[transcription]"));
        assert!(toml.contains("engine = \"vosk\""));
        assert!(toml.contains("model = \"small\""));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[transcription]\nengine = \"whisper\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.transcription.engine, Engine::Whisper);
        assert_eq!(parsed.transcription.model, ModelSize::Small);
        assert_eq!(parsed.tools.ffmpeg, "ffmpeg");
        assert_eq!(parsed.runner.kill_timeout(), Duration::from_secs(2));
        assert!(parsed.paths.output_folder.is_empty());
        assert_eq!(parsed.logging.level, LogLevel::Info);
    }

    #[test]
    fn logging_level_reads_lowercase() {
        let parsed: Settings = toml::from_str("[logging]\nlevel = \"debug\"").unwrap();
        assert_eq!(parsed.logging.level, LogLevel::Debug);

        let toml = toml::to_string_pretty(&Settings::default()).unwrap();
        assert!(toml.contains("level = \"info\""));
    }

    #[test]
    fn task_log_dir_respects_toggle() {
        let mut paths = PathSettings::default();
        assert_eq!(paths.task_log_dir(), Some(PathBuf::from(".logs")));
        paths.task_logs = false;
        assert_eq!(paths.task_log_dir(), None);
    }
}
