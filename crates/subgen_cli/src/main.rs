use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use subgen_core::config::ConfigManager;
use subgen_core::logging::{init_tracing, LogLevel};
use subgen_core::orchestrator::{
    PipelineController, PipelineEvent, ScriptLocator, TaskOutcome, TaskResult,
};

mod cli;

use cli::Cli;

/// Conventional exit status after SIGINT.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    config
        .ensure_dirs_exist()
        .context("Failed to create configured directories")?;
    let mut settings = config.into_settings();
    cli.apply(&mut settings);

    let output_dir = settings.paths.output_dir();
    let resolver = Arc::new(ScriptLocator::new(&settings.tools.transcribe_script));
    let (handle, mut events, controller) = PipelineController::spawn(settings, resolver);

    let mut queued = 0usize;
    for file in &cli.files {
        let Some(path) = input_path(file) else {
            eprintln!("Skipping {}: not a readable file", file.display());
            continue;
        };
        if handle.enqueue(path, &output_dir).await? {
            queued += 1;
        }
    }

    if queued == 0 {
        handle.shutdown().await?;
        controller.await?;
        eprintln!("Nothing to do");
        return Ok(ExitCode::FAILURE);
    }

    let mut finished = 0usize;
    let mut failed = 0usize;

    while finished < queued {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let PipelineEvent::TaskFinished(outcome) = &event {
                    finished += 1;
                    if !outcome.succeeded() {
                        failed += 1;
                    }
                }
                print_event(&event, cli.json, cli.verbose)?;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted, stopping current task");
                handle.shutdown().await?;
                controller.await?;
                return Ok(ExitCode::from(INTERRUPTED));
            }
        }
    }

    handle.shutdown().await?;
    controller.await?;

    if !cli.json {
        println!("{} of {} succeeded", finished - failed, queued);
    }

    Ok(if failed == 0 && finished == queued {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Absolute path of an existing regular file.
fn input_path(file: &Path) -> Option<PathBuf> {
    fs::canonicalize(file).ok().filter(|p| p.is_file())
}

fn print_event(event: &PipelineEvent, json: bool, verbose: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        PipelineEvent::Enqueued { path, added: false } => {
            println!("Already queued: {}", path.display());
        }
        PipelineEvent::Status { text } => println!("{}", text),
        PipelineEvent::Log { line } if verbose => println!("  {}", line),
        PipelineEvent::TaskFinished(outcome) => print_outcome(outcome),
        _ => {}
    }
    Ok(())
}

fn print_outcome(outcome: &TaskOutcome) {
    let name = outcome.input.display();
    match &outcome.result {
        TaskResult::Succeeded { output_video, .. } => println!(
            "Done: {} -> {} ({:.1}s)",
            name,
            output_video.display(),
            outcome.elapsed_secs
        ),
        TaskResult::Failed { reason, message } => {
            println!("Failed: {} [{}] {}", name, reason, message)
        }
    }
}
