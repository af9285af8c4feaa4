//! Task types and data structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{Stage, TaskPaths};

/// A single video in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Source video; unique key within the queue.
    pub input_path: PathBuf,
    /// Target directory. Empty = beside the input.
    pub output_dir: PathBuf,
    /// Current stage. `Stage::None` until the task is activated.
    pub stage: Stage,
}

impl Task {
    /// Create a new pending task.
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            stage: Stage::None,
        }
    }

    /// Whether the task is in flight.
    pub fn is_active(&self) -> bool {
        self.stage != Stage::None
    }

    /// Every path this task reads or writes.
    pub fn paths(&self) -> TaskPaths {
        TaskPaths::derive(&self.input_path, &self.output_dir)
    }

    /// Final video path.
    pub fn output_video_path(&self) -> PathBuf {
        self.paths().output_video
    }

    /// Short name for display and log file names.
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input_path.to_string_lossy().to_string())
    }

    /// Whether this task refers to `path`.
    pub fn matches(&self, path: &Path) -> bool {
        self.input_path == path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending() {
        let task = Task::new("/videos/clip.mp4", "");
        assert!(!task.is_active());
        assert_eq!(task.display_name(), "clip.mp4");
        assert_eq!(
            task.output_video_path(),
            PathBuf::from("/videos/clip_subtitled.mp4")
        );
    }
}
