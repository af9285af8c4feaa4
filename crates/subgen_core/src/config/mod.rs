//! Configuration management for subgen.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use subgen_core::config::{ConfigManager, ConfigSection};
//! use subgen_core::models::Engine;
//!
//! let mut config = ConfigManager::new(".config/subgen.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().transcription.engine = Engine::Whisper;
//! config.update_section(ConfigSection::Transcription).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PathSettings, RunnerSettings, Settings, ToolSettings,
    TranscriptionSettings,
};
