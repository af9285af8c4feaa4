//! FIFO task queue with a single active front task.

use std::path::{Path, PathBuf};

use super::types::Task;
use crate::models::Stage;

/// In-memory task queue.
///
/// Insertion order is processing order. Only the front task can be active;
/// it leaves the queue through [`TaskQueue::pop_front`] once it reaches a
/// terminal outcome.
#[derive(Debug, Default)]
pub struct TaskQueue {
    /// Tasks in queue order.
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending task.
    ///
    /// Returns false (and leaves the queue untouched) if `path` is already
    /// queued, including as the active task.
    pub fn enqueue(&mut self, path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            tracing::debug!("Ignoring duplicate task: {}", path.display());
            return false;
        }

        self.tasks.push(Task::new(path, output_dir));
        true
    }

    /// Remove a pending task.
    ///
    /// Returns false if `path` is the active task or not queued.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.tasks.iter().position(|t| t.matches(path)) {
            Some(index) if self.tasks[index].is_active() => false,
            Some(index) => {
                self.tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Update the output directory of every task that has not started.
    pub fn set_output_dir_for_pending(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        for task in self.tasks.iter_mut().filter(|t| !t.is_active()) {
            task.output_dir = dir.to_path_buf();
        }
    }

    /// The front task (active, or next to be activated).
    pub fn front(&self) -> Option<&Task> {
        self.tasks.first()
    }

    /// The active task, if any.
    pub fn active(&self) -> Option<&Task> {
        self.tasks.first().filter(|t| t.is_active())
    }

    /// Mark the front task as entering `stage`.
    ///
    /// Returns the updated task, or `None` if the queue is empty.
    pub fn set_front_stage(&mut self, stage: Stage) -> Option<&Task> {
        let task = self.tasks.first_mut()?;
        task.stage = stage;
        Some(task)
    }

    /// Remove the front task after it reached a terminal outcome.
    ///
    /// Does not activate the next task.
    pub fn pop_front(&mut self) -> Option<Task> {
        if self.tasks.is_empty() {
            None
        } else {
            Some(self.tasks.remove(0))
        }
    }

    /// Whether `path` is queued.
    pub fn contains(&self, path: &Path) -> bool {
        self.tasks.iter().any(|t| t.matches(path))
    }

    /// Tasks that have not started, in processing order.
    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_active())
    }

    /// All tasks, front first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(queue: &TaskQueue) -> Vec<String> {
        queue.tasks().iter().map(|t| t.display_name()).collect()
    }

    #[test]
    fn enqueue_rejects_duplicates() {
        let mut queue = TaskQueue::new();
        assert!(queue.enqueue("/v/a.mp4", ""));
        assert!(!queue.enqueue("/v/a.mp4", "/other"));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().unwrap().output_dir, PathBuf::new());
    }

    #[test]
    fn enqueue_rejects_active_path() {
        let mut queue = TaskQueue::new();
        queue.enqueue("/v/a.mp4", "");
        queue.set_front_stage(Stage::Transcribe);

        assert!(!queue.enqueue("/v/a.mp4", ""));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_refuses_active_task() {
        let mut queue = TaskQueue::new();
        queue.enqueue("/v/a.mp4", "");
        queue.enqueue("/v/b.mp4", "");
        queue.set_front_stage(Stage::Extract);

        assert!(!queue.remove(Path::new("/v/a.mp4")));
        assert_eq!(names(&queue), vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn remove_pending_preserves_order() {
        let mut queue = TaskQueue::new();
        for name in ["a", "b", "c", "d"] {
            queue.enqueue(format!("/v/{}.mp4", name), "");
        }
        queue.set_front_stage(Stage::Extract);

        assert!(queue.remove(Path::new("/v/c.mp4")));
        assert!(!queue.remove(Path::new("/v/missing.mp4")));
        assert_eq!(names(&queue), vec!["a.mp4", "b.mp4", "d.mp4"]);
    }

    #[test]
    fn inactive_front_can_be_removed() {
        let mut queue = TaskQueue::new();
        queue.enqueue("/v/a.mp4", "");
        assert!(queue.remove(Path::new("/v/a.mp4")));
        assert!(queue.is_empty());
    }

    #[test]
    fn output_dir_update_skips_active() {
        let mut queue = TaskQueue::new();
        queue.enqueue("/v/a.mp4", "/first");
        queue.enqueue("/v/b.mp4", "/first");
        queue.set_front_stage(Stage::Embed);

        queue.set_output_dir_for_pending("/second");

        assert_eq!(queue.tasks()[0].output_dir, PathBuf::from("/first"));
        assert_eq!(queue.tasks()[1].output_dir, PathBuf::from("/second"));
    }

    #[test]
    fn pop_front_does_not_activate_next() {
        let mut queue = TaskQueue::new();
        queue.enqueue("/v/a.mp4", "");
        queue.enqueue("/v/b.mp4", "");
        queue.set_front_stage(Stage::Extract);

        let done = queue.pop_front().unwrap();
        assert_eq!(done.display_name(), "a.mp4");
        assert!(queue.active().is_none());
        assert_eq!(queue.front().unwrap().stage, Stage::None);
        assert_eq!(queue.pending().count(), 1);
    }
}
