//! Task queue management.
//!
//! This module provides:
//! - `TaskQueue`: ordered, deduplicated queue with a single active front task
//! - `Task`: one input video, its output directory and current stage

mod queue;
mod types;

pub use queue::TaskQueue;
pub use types::Task;
