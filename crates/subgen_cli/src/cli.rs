//! Command-line interface for subgen.

use std::path::PathBuf;

use clap::Parser;
use subgen_core::config::Settings;
use subgen_core::logging::LogLevel;
use subgen_core::models::{Engine, ModelSize};

/// Transcribe videos and burn the subtitles in, one file at a time
#[derive(Parser, Debug)]
#[command(name = "subgen", version, about = "Transcribe videos and burn the subtitles in")]
pub struct Cli {
    /// Video files, processed in the given order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Directory for subtitles and subtitled videos (default: beside each input)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Speech engine (vosk, whisper)
    #[arg(long, value_name = "ENGINE")]
    pub engine: Option<Engine>,

    /// Model size for whisper (tiny, base, small, medium, large)
    #[arg(long, value_name = "SIZE")]
    pub model: Option<ModelSize>,

    /// Transcription script (default: configured path, then scripts/ near the binary)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", default_value = ".config/subgen.toml")]
    pub config: PathBuf,

    /// Print every event as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Show tool output and debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.output_dir {
            let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
            settings.paths.output_folder = dir.to_string_lossy().into_owned();
        }
        if let Some(engine) = self.engine {
            settings.transcription.engine = engine;
        }
        if let Some(model) = self.model {
            settings.transcription.model = model;
        }
        if let Some(script) = &self.script {
            settings.tools.transcribe_script = script.to_string_lossy().into_owned();
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            settings.tools.ffmpeg = ffmpeg.clone();
        }
        if self.verbose {
            settings.logging.compact = false;
            settings.logging.level = LogLevel::Debug;
        }
    }
}
