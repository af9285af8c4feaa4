//! Events delivered to collaborators.

use std::path::PathBuf;

use serde::Serialize;

use crate::models::{FailureReason, Stage};

/// Outbound notification from the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Result of an enqueue request.
    Enqueued { path: PathBuf, added: bool },
    /// Result of a remove request.
    Removed { path: PathBuf, removed: bool },
    /// Overall progress of the active task.
    Progress { percent: u8, label: String },
    Status { text: String },
    /// A formatted task log line.
    Log { line: String },
    TaskFinished(TaskOutcome),
    /// The queue ran empty after a task finished.
    QueueDrained,
}

/// Terminal record of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub input: PathBuf,
    pub result: TaskResult,
    /// Stages launched, in order.
    pub stages: Vec<Stage>,
    pub elapsed_secs: f64,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, TaskResult::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    Succeeded {
        output_video: PathBuf,
        subtitle: PathBuf,
    },
    Failed {
        reason: FailureReason,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let event = PipelineEvent::TaskFinished(TaskOutcome {
            input: PathBuf::from("/v/clip.mp4"),
            result: TaskResult::Failed {
                reason: FailureReason::Extract,
                message: "audio extraction failed (exit code 1)".to_string(),
            },
            stages: vec![Stage::Extract],
            elapsed_secs: 0.5,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task_finished");
        assert_eq!(json["result"]["status"], "failed");
        assert_eq!(json["result"]["reason"], "extract");
        assert_eq!(json["stages"][0], "extract");

        let drained = serde_json::to_value(&PipelineEvent::QueueDrained).unwrap();
        assert_eq!(drained["event"], "queue_drained");
    }
}
