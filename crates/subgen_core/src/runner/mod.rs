//! Single-slot external process runner.
//!
//! At most one child process is alive at a time. Output is streamed back as
//! [`ProcessEvent`]s tagged with the run id returned by
//! [`ProcessRunner::run`], so a consumer can ignore events from a process it
//! has already replaced.
//!
//! Event order per run:
//! - `Stdout` lines and `Stderr` chunks, each in emission order
//! - exactly one `Exited`, after both pipes have been drained
//!
//! A program that cannot be started produces an immediate `Exited` with
//! [`START_FAILURE_CODE`] instead of an error return.

mod command;
mod process;

pub use command::CommandSpec;
pub use process::{
    ExitInfo, ExitKind, ProcessEvent, ProcessEventKind, ProcessRunner, RunnerError, RunnerResult,
    START_FAILURE_CODE,
};
