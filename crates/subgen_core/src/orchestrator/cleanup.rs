//! Intermediate file handling around a task.
//!
//! Every function here is best-effort: failures become warnings in the task
//! log and never change the task's outcome.

use std::fs;
use std::io;
use std::path::Path;

use crate::logging::TaskLogger;
use crate::models::TaskPaths;

/// Remove whatever a previous run left at this task's paths.
pub fn clear_stale(paths: &TaskPaths, logger: &TaskLogger) {
    for path in paths.stale_candidates() {
        if remove_file(path, logger) {
            logger.debug(&format!("Removed stale {}", path.display()));
        }
    }
}

/// Copy the generated subtitle to its render-time name in the target
/// directory.
pub fn stage_render_subtitle(paths: &TaskPaths) -> io::Result<u64> {
    fs::copy(&paths.subtitle, &paths.render_subtitle)
}

/// Remove intermediates after a terminal outcome.
///
/// The generated subtitle is a deliverable and is kept, except that a
/// zero-length one left by a failed run is removed.
pub fn cleanup_terminal(paths: &TaskPaths, succeeded: bool, logger: &TaskLogger) {
    for path in paths.temporaries() {
        remove_file(path, logger);
    }

    if !succeeded && is_empty_file(&paths.subtitle) {
        remove_file(&paths.subtitle, logger);
    }
}

/// Delete `path` if it exists. Returns true if a file was removed.
fn remove_file(path: &Path, logger: &TaskLogger) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            let message = format!("Could not remove {}: {}", path.display(), e);
            tracing::warn!("{}", message);
            logger.warn(&message);
            false
        }
    }
}

fn is_empty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use tempfile::tempdir;

    fn logger() -> TaskLogger {
        TaskLogger::new("clip", None, LogConfig::default(), None).unwrap()
    }

    fn touch(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn clear_stale_removes_all_previous_artifacts() {
        let dir = tempdir().unwrap();
        let paths = TaskPaths::derive(dir.path().join("clip.mp4"), "");
        for path in paths.stale_candidates() {
            touch(path, "old");
        }

        clear_stale(&paths, &logger());

        for path in paths.stale_candidates() {
            assert!(!path.exists(), "{} survived", path.display());
        }
    }

    #[test]
    fn success_keeps_subtitle_and_output() {
        let dir = tempdir().unwrap();
        let paths = TaskPaths::derive(dir.path().join("clip.mp4"), "");
        touch(&paths.temp_audio, "wav");
        touch(&paths.subtitle, "1\n");
        touch(&paths.render_subtitle, "1\n");
        touch(&paths.output_video, "mp4");

        cleanup_terminal(&paths, true, &logger());

        assert!(!paths.temp_audio.exists());
        assert!(!paths.render_subtitle.exists());
        assert!(paths.subtitle.exists());
        assert!(paths.output_video.exists());
    }

    #[test]
    fn failure_drops_empty_subtitle_only() {
        let dir = tempdir().unwrap();
        let paths = TaskPaths::derive(dir.path().join("clip.mp4"), "");
        touch(&paths.subtitle, "");

        cleanup_terminal(&paths, false, &logger());
        assert!(!paths.subtitle.exists());

        touch(&paths.subtitle, "1\n");
        cleanup_terminal(&paths, false, &logger());
        assert!(paths.subtitle.exists());
    }

    #[test]
    fn staging_copies_subtitle() {
        let dir = tempdir().unwrap();
        let paths = TaskPaths::derive(dir.path().join("clip.mp4"), "");
        touch(&paths.subtitle, "subs");

        stage_render_subtitle(&paths).unwrap();
        assert_eq!(fs::read_to_string(&paths.render_subtitle).unwrap(), "subs");
    }

    #[test]
    fn staging_without_subtitle_fails() {
        let dir = tempdir().unwrap();
        let paths = TaskPaths::derive(dir.path().join("clip.mp4"), "");
        assert!(stage_render_subtitle(&paths).is_err());
    }
}
