//! The pipeline controller.
//!
//! A single task owns the queue, the active task and the process runner.
//! It reacts to two inputs:
//!
//! - commands from [`ControllerHandle`]s (enqueue, remove, shutdown, ...)
//! - output and exit events from the runner
//!
//! Nothing else touches the queue, so no locks are needed.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::jobs::{Task, TaskQueue};
use crate::logging::{LogCallback, LogConfig, MessagePrefix, TaskLogger};
use crate::models::{Stage, TaskPaths};
use crate::parser::{
    is_spinner, media_overall, parse_transcriber_line, transcribe_overall, LineAssembler,
    MediaProgress, Progress, TranscriberLine,
};
use crate::runner::{CommandSpec, ExitInfo, ProcessEvent, ProcessEventKind, ProcessRunner};
use crate::subtitles::{inspect_subtitle, SubtitleStatus};

use super::cleanup;
use super::commands;
use super::errors::{ControllerError, ControllerResult, TaskError};
use super::events::{PipelineEvent, TaskOutcome, TaskResult};
use super::resolver::TranscriberResolver;
use super::transitions::{transition, Effect, Next, StageOutcome};

const STAGE_COUNT: u8 = 3;

enum ControlCommand {
    Enqueue {
        path: PathBuf,
        output_dir: PathBuf,
        reply: oneshot::Sender<bool>,
    },
    Remove {
        path: PathBuf,
        reply: oneshot::Sender<bool>,
    },
    SetOutputDir {
        dir: PathBuf,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Task>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle for talking to a running controller.
///
/// Dropping every handle shuts the controller down.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<ControlCommand>,
}

impl ControllerHandle {
    /// Queue `path`. An empty `output_dir` writes results beside the input.
    ///
    /// Returns false if the path is already queued or running.
    pub async fn enqueue(
        &self,
        path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> ControllerResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Enqueue {
            path: path.into(),
            output_dir: output_dir.into(),
            reply,
        })?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Remove a pending task. The running task cannot be removed.
    pub async fn remove(&self, path: impl Into<PathBuf>) -> ControllerResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Remove {
            path: path.into(),
            reply,
        })?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Change the output directory of every task that has not started.
    pub async fn set_output_dir(&self, dir: impl Into<PathBuf>) -> ControllerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::SetOutputDir {
            dir: dir.into(),
            reply,
        })?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Current queue contents, running task first.
    pub async fn tasks(&self) -> ControllerResult<Vec<Task>> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Snapshot { reply })?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    /// Kill the running process, clean up its intermediates and stop the
    /// controller. Resolves once the controller has finished.
    pub async fn shutdown(&self) -> ControllerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::Shutdown { reply })?;
        rx.await.map_err(|_| ControllerError::Closed)
    }

    fn send(&self, command: ControlCommand) -> ControllerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ControllerError::Closed)
    }
}

/// State of the task currently in flight.
struct ActiveTask {
    paths: TaskPaths,
    /// Base name used in status labels.
    name: String,
    stage: Stage,
    /// Run id of the stage's process, `None` between stages.
    run_id: Option<u64>,
    stages: Vec<Stage>,
    started: Instant,
    logger: TaskLogger,
    stderr: LineAssembler,
    media: MediaProgress,
}

impl ActiveTask {
    fn label(&self, stage_percent: Option<u8>) -> String {
        let step = format!(
            "Step {}/{}: {}",
            self.stage.ordinal(),
            STAGE_COUNT,
            self.stage.label()
        );
        match stage_percent {
            Some(percent) => format!("{} {}% - {}", step, percent, self.name),
            None => format!("{} - {}", step, self.name),
        }
    }
}

/// Drives queued tasks through Extract, Transcribe and Embed.
pub struct PipelineController {
    settings: Settings,
    resolver: Arc<dyn TranscriberResolver>,
    queue: TaskQueue,
    runner: ProcessRunner,
    process_events: mpsc::UnboundedReceiver<ProcessEvent>,
    commands: mpsc::UnboundedReceiver<ControlCommand>,
    events: mpsc::UnboundedSender<PipelineEvent>,
    active: Option<ActiveTask>,
}

impl PipelineController {
    /// Create a controller, its handle and the receiver of its events.
    pub fn new(
        settings: Settings,
        resolver: Arc<dyn TranscriberResolver>,
    ) -> (
        Self,
        ControllerHandle,
        mpsc::UnboundedReceiver<PipelineEvent>,
    ) {
        let (process_tx, process_events) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let runner = ProcessRunner::new(
            process_tx,
            settings.runner.kill_timeout(),
            settings.runner.drain_timeout(),
        );

        let controller = Self {
            settings,
            resolver,
            queue: TaskQueue::new(),
            runner,
            process_events,
            commands,
            events,
            active: None,
        };
        let handle = ControllerHandle {
            commands: command_tx,
        };

        (controller, handle, event_rx)
    }

    /// Create a controller and run it on the current tokio runtime.
    pub fn spawn(
        settings: Settings,
        resolver: Arc<dyn TranscriberResolver>,
    ) -> (
        ControllerHandle,
        mpsc::UnboundedReceiver<PipelineEvent>,
        JoinHandle<()>,
    ) {
        let (controller, handle, events) = Self::new(settings, resolver);
        let task = tokio::spawn(controller.run());
        (handle, events, task)
    }

    /// Process commands and process events until shutdown.
    pub async fn run(mut self) {
        tracing::debug!("Pipeline controller started");

        loop {
            tokio::select! {
                Some(event) = self.process_events.recv() => {
                    self.on_process_event(event).await;
                }
                command = self.commands.recv() => {
                    let keep_running = match command {
                        Some(command) => self.on_command(command).await,
                        None => {
                            self.shutdown().await;
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Pipeline controller stopped");
    }

    /// Returns false once the controller should stop.
    async fn on_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Enqueue {
                path,
                output_dir,
                reply,
            } => {
                let added = self.queue.enqueue(path.clone(), output_dir);
                if added {
                    tracing::info!("Queued {}", path.display());
                }
                emit(&self.events, PipelineEvent::Enqueued { path, added });
                let _ = reply.send(added);

                if added && self.active.is_none() {
                    self.start_next().await;
                }
            }
            ControlCommand::Remove { path, reply } => {
                let removed = self.queue.remove(&path);
                if removed {
                    tracing::info!("Removed {}", path.display());
                }
                emit(&self.events, PipelineEvent::Removed { path, removed });
                let _ = reply.send(removed);
            }
            ControlCommand::SetOutputDir { dir, reply } => {
                self.queue.set_output_dir_for_pending(&dir);
                let _ = reply.send(());
            }
            ControlCommand::Snapshot { reply } => {
                let _ = reply.send(self.queue.tasks().to_vec());
            }
            ControlCommand::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    /// Activate queued tasks until one has a running process or the queue
    /// is empty.
    async fn start_next(&mut self) {
        while self.active.is_none() {
            let Some(task) = self.queue.set_front_stage(Stage::Extract).cloned() else {
                tracing::info!("Queue drained");
                emit(&self.events, PipelineEvent::QueueDrained);
                return;
            };

            self.active = Some(self.open_task(&task));

            let started = match self.prepare_target() {
                Ok(()) => self.launch(Stage::Extract).await,
                Err(err) => Err(err),
            };
            if let Err(err) = started {
                self.finish_task(Err(err));
            }
        }
    }

    fn open_task(&self, task: &Task) -> ActiveTask {
        let paths = task.paths();
        let name = paths.base_name();
        let config = LogConfig::from(&self.settings.logging);
        let log_dir = self.settings.paths.task_log_dir();

        let logger = match TaskLogger::new(
            name.as_str(),
            log_dir.as_deref(),
            config.clone(),
            Some(self.log_callback()),
        ) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!("Could not open task log for {}: {}", name, e);
                TaskLogger::callback_only(config, self.log_callback())
            }
        };

        logger.info(&format!("Input: {}", paths.input.display()));
        logger.info(&format!("Output: {}", paths.output_video.display()));

        ActiveTask {
            paths,
            name,
            stage: Stage::Extract,
            run_id: None,
            stages: Vec::with_capacity(STAGE_COUNT as usize),
            started: Instant::now(),
            logger,
            stderr: LineAssembler::new(),
            media: MediaProgress::new(),
        }
    }

    fn log_callback(&self) -> LogCallback {
        let events = self.events.clone();
        Box::new(move |line| {
            let _ = events.send(PipelineEvent::Log {
                line: line.to_string(),
            });
        })
    }

    /// Create the target directory and clear leftovers of earlier runs.
    fn prepare_target(&self) -> Result<(), TaskError> {
        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };

        let target = &active.paths.target_dir;
        if !target.as_os_str().is_empty() && !target.exists() {
            fs::create_dir_all(target).map_err(|e| {
                TaskError::start_failure(
                    Stage::Extract,
                    format!("cannot create {}: {}", target.display(), e),
                )
            })?;
            active
                .logger
                .info(&format!("Created output directory {}", target.display()));
        }

        cleanup::clear_stale(&active.paths, &active.logger);
        Ok(())
    }

    fn command_for(&self, stage: Stage) -> Result<CommandSpec, TaskError> {
        let Some(active) = self.active.as_ref() else {
            return Err(TaskError::start_failure(stage, "no active task"));
        };
        let tools = &self.settings.tools;

        match stage {
            Stage::Extract => Ok(commands::extract_command(&tools.ffmpeg, &active.paths)),
            Stage::Transcribe => {
                let script = self
                    .resolver
                    .resolve()
                    .map_err(|e| TaskError::start_failure(stage, e.to_string()))?;
                Ok(commands::transcribe_command(
                    &tools.python,
                    &script,
                    &active.paths,
                    &self.settings.transcription,
                ))
            }
            Stage::Embed => Ok(commands::embed_command(&tools.ffmpeg, &active.paths)),
            Stage::None => Err(TaskError::start_failure(stage, "nothing to run")),
        }
    }

    /// Start `stage` of the active task.
    ///
    /// A program that cannot be spawned is reported later through its exit
    /// event; errors returned here come from building the command.
    async fn launch(&mut self, stage: Stage) -> Result<(), TaskError> {
        let spec = self.command_for(stage)?;
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        self.queue.set_front_stage(stage);
        active.stage = stage;
        active.stages.push(stage);
        active.stderr = LineAssembler::new();
        if stage.runs_media_tool() {
            active.media.reset();
        }

        active.logger.clear_tail();
        active.logger.reset_progress();
        active.logger.phase(&active.label(None));
        active.logger.command(&spec.to_string());

        let label = active.label(None);
        emit(&self.events, PipelineEvent::Status { text: label.clone() });
        emit(
            &self.events,
            PipelineEvent::Progress {
                percent: stage_start(stage),
                label,
            },
        );

        active.run_id = Some(self.runner.run(&spec).await);
        Ok(())
    }

    async fn on_process_event(&mut self, event: ProcessEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.run_id != Some(event.run_id) {
            tracing::trace!("Ignoring event from finished run {}", event.run_id);
            return;
        }

        match event.kind {
            ProcessEventKind::Stdout(line) => self.on_stdout(&line),
            ProcessEventKind::Stderr(chunk) => {
                for line in active.stderr.push(&chunk) {
                    self.on_stderr_line(&line);
                }
            }
            ProcessEventKind::Exited(exit) => self.on_exit(exit).await,
        }
    }

    fn on_stdout(&mut self, line: &str) {
        let Some(active) = self.active.as_ref() else {
            return;
        };

        match parse_transcriber_line(line) {
            Some(TranscriberLine::Download(percent)) => emit(
                &self.events,
                PipelineEvent::Status {
                    text: format!("Downloading model: {}%", percent),
                },
            ),
            Some(TranscriberLine::Progress(progress)) => {
                report_progress(&self.events, active, progress)
            }
            Some(TranscriberLine::Log(text)) => {
                active.logger.record(&text);
                active.logger.tool(MessagePrefix::Transcriber, &text);
            }
            None => {}
        }
    }

    fn on_stderr_line(&mut self, line: &str) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let parsed = active.media.feed(active.stage, line);
        if let Some(duration) = parsed.duration_secs {
            active
                .logger
                .debug(&format!("Input duration: {:.2}s", duration));
        }
        if let Some(progress) = parsed.progress {
            report_progress(&self.events, active, progress);
        }

        match parsed.log {
            Some(text) => {
                active.logger.record(&text);
                active.logger.tool(MessagePrefix::Stderr, &text);
            }
            None if !is_spinner(line) => active.logger.output_line(line, true),
            None => {}
        }
    }

    async fn on_exit(&mut self, exit: ExitInfo) {
        let remainder = self.active.as_mut().and_then(|a| a.stderr.finish());
        if let Some(line) = remainder {
            self.on_stderr_line(&line);
        }

        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.run_id = None;
        let stage = active.stage;
        active
            .logger
            .debug(&format!("{} finished: {}", stage, exit));

        let mut outcome = StageOutcome::new(exit);
        if stage == Stage::Transcribe && outcome.exit.success() {
            let status = inspect_subtitle(&active.paths.subtitle);
            if let SubtitleStatus::Present { entries } = status {
                active
                    .logger
                    .info(&format!("Subtitle has {} entries", entries));
            }
            outcome = outcome.with_subtitle(status);
        }

        let step = transition(stage, &outcome);
        let result = match step.next {
            Next::Success => Some(Ok(())),
            Next::Failed(err) => Some(Err(err)),
            Next::Stage(_) => self.apply_effects(&step.effects).await.err().map(Err),
        };

        if let Some(result) = result {
            self.finish_task(result);
            self.start_next().await;
        }
    }

    async fn apply_effects(&mut self, effects: &[Effect]) -> Result<(), TaskError> {
        for effect in effects {
            match *effect {
                Effect::StageRenderSubtitle => self.stage_render_subtitle()?,
                Effect::Launch(stage) => self.launch(stage).await?,
            }
        }
        Ok(())
    }

    fn stage_render_subtitle(&self) -> Result<(), TaskError> {
        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };

        cleanup::stage_render_subtitle(&active.paths).map_err(|e| {
            TaskError::start_failure(
                Stage::Embed,
                format!(
                    "cannot copy subtitle to {}: {}",
                    active.paths.render_subtitle.display(),
                    e
                ),
            )
        })?;
        Ok(())
    }

    /// Report, clean up and retire the active task. Does not start the next.
    fn finish_task(&mut self, result: Result<(), TaskError>) {
        let Some(active) = self.active.take() else {
            return;
        };
        let elapsed = active.started.elapsed();

        let result = match result {
            Ok(()) => {
                active.logger.success(&format!(
                    "Created {}",
                    active.paths.output_video.display()
                ));
                tracing::info!(
                    "{} finished in {:.1}s",
                    active.name,
                    elapsed.as_secs_f64()
                );
                emit(
                    &self.events,
                    PipelineEvent::Progress {
                        percent: 100,
                        label: format!("Done - {}", active.name),
                    },
                );
                TaskResult::Succeeded {
                    output_video: active.paths.output_video.clone(),
                    subtitle: active.paths.subtitle.clone(),
                }
            }
            Err(err) => {
                let reason = err.reason();
                let message = format!("{} failed [{}]: {}", active.name, reason, err);
                active.logger.error(&message);
                active.logger.show_tail(reason.code());
                tracing::warn!("{}", message);
                TaskResult::Failed {
                    reason,
                    message: err.to_string(),
                }
            }
        };

        let succeeded = matches!(result, TaskResult::Succeeded { .. });
        cleanup::cleanup_terminal(&active.paths, succeeded, &active.logger);
        active.logger.close();

        self.queue.pop_front();
        emit(
            &self.events,
            PipelineEvent::TaskFinished(TaskOutcome {
                input: active.paths.input.clone(),
                result,
                stages: active.stages.clone(),
                elapsed_secs: elapsed.as_secs_f64(),
            }),
        );
    }

    async fn shutdown(&mut self) {
        tracing::info!("Shutting down pipeline");

        if let Err(e) = self.runner.shutdown().await {
            tracing::warn!("{}", e);
        }

        if let Some(active) = self.active.take() {
            active.logger.warn("Stopped by shutdown");
            cleanup::cleanup_terminal(&active.paths, false, &active.logger);
            active.logger.close();
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<PipelineEvent>, event: PipelineEvent) {
    // The receiver going away only means nobody is listening.
    let _ = events.send(event);
}

fn report_progress(
    events: &mpsc::UnboundedSender<PipelineEvent>,
    active: &ActiveTask,
    progress: Progress,
) {
    emit(
        events,
        PipelineEvent::Progress {
            percent: progress.overall,
            label: active.label(Some(progress.stage_percent)),
        },
    );
    active.logger.progress(u32::from(progress.stage_percent));
}

/// Overall percentage at which `stage` begins.
fn stage_start(stage: Stage) -> u8 {
    match stage {
        Stage::Transcribe => transcribe_overall(0),
        _ => media_overall(stage, 0).unwrap_or(0),
    }
}
