//! Task pipeline orchestration.
//!
//! # Architecture
//!
//! ```text
//! ControllerHandle ──commands──▶ PipelineController ──PipelineEvent──▶ collaborator
//!                                   │        ▲
//!                          CommandSpec│        │ProcessEvent
//!                                   ▼        │
//!                                 ProcessRunner ── ffmpeg / transcriber
//! ```
//!
//! Each task runs Extract → Transcribe → Embed. The stage order and failure
//! handling live in [`transition`], a pure function the controller consults
//! after every process exit.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use subgen_core::config::Settings;
//! use subgen_core::orchestrator::{PipelineController, PipelineEvent, ScriptLocator};
//!
//! # async fn demo() {
//! let settings = Settings::default();
//! let resolver = Arc::new(ScriptLocator::new(&settings.tools.transcribe_script));
//! let (handle, mut events, _task) = PipelineController::spawn(settings, resolver);
//!
//! handle.enqueue("/videos/clip.mp4", "").await.unwrap();
//! while let Some(event) = events.recv().await {
//!     if event == PipelineEvent::QueueDrained {
//!         break;
//!     }
//! }
//! handle.shutdown().await.unwrap();
//! # }
//! ```

mod cleanup;
mod commands;
mod controller;
mod errors;
mod events;
mod resolver;
mod transitions;

pub use commands::{embed_command, extract_command, transcribe_command};
pub use controller::{ControllerHandle, PipelineController};
pub use errors::{ControllerError, ControllerResult, TaskError};
pub use events::{PipelineEvent, TaskOutcome, TaskResult};
pub use resolver::{FixedScript, ResolveError, ScriptLocator, TranscriberResolver};
pub use transitions::{transition, Effect, Next, StageOutcome, Transition};
