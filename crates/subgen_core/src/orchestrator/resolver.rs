//! Locating the transcription script.

use std::path::{Path, PathBuf};

use thiserror::Error;

const SCRIPT_DIR: &str = "scripts";
const SCRIPT_NAME: &str = "transcribe.py";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("transcription script not found (tried: {tried})")]
    NotFound { tried: String },
}

/// Supplies the path of the transcription script.
///
/// Called each time a Transcribe stage starts.
pub trait TranscriberResolver: Send + Sync {
    fn resolve(&self) -> Result<PathBuf, ResolveError>;
}

/// Checks a configured path, then the `scripts/` directories around the
/// executable.
#[derive(Debug, Clone, Default)]
pub struct ScriptLocator {
    configured: Option<PathBuf>,
    exe_dir: Option<PathBuf>,
}

impl ScriptLocator {
    /// Locator for the running executable. An empty `configured` path is
    /// ignored.
    pub fn new(configured: impl AsRef<Path>) -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::with_exe_dir(configured, exe_dir)
    }

    pub fn with_exe_dir(configured: impl AsRef<Path>, exe_dir: Option<PathBuf>) -> Self {
        let configured = configured.as_ref();
        Self {
            configured: (!configured.as_os_str().is_empty()).then(|| configured.to_path_buf()),
            exe_dir,
        }
    }

    /// Paths checked, in order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self.configured.iter().cloned().collect();
        if let Some(dir) = &self.exe_dir {
            candidates.push(dir.join("..").join(SCRIPT_DIR).join(SCRIPT_NAME));
            candidates.push(dir.join(SCRIPT_DIR).join(SCRIPT_NAME));
        }
        candidates
    }
}

impl TranscriberResolver for ScriptLocator {
    fn resolve(&self) -> Result<PathBuf, ResolveError> {
        let candidates = self.candidates();
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Ok(found.clone());
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ResolveError::NotFound { tried })
    }
}

/// Always returns the same path, whether or not it exists.
#[derive(Debug, Clone)]
pub struct FixedScript(pub PathBuf);

impl TranscriberResolver for FixedScript {
    fn resolve(&self) -> Result<PathBuf, ResolveError> {
        Ok(self.0.clone())
    }
}
