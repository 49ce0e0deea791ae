// src/lib.rs

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod step;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::exec::TracingSink;
use crate::step::RunStep;
use crate::types::{CommandSpec, EnvironmentOverlay, WorkingDirectory};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - step resolution (ad-hoc command or step file)
/// - Ctrl-C / `--timeout` cancellation
/// - execution + output hashing
/// - reporting: one `<digest>  <path>` line per output on stdout
///
/// Returns an error if any error diagnostic was produced.
pub async fn run(args: CliArgs) -> Result<()> {
    let step = resolve_step(&args)?;

    if args.dry_run {
        print_dry_run(&step);
        return Ok(());
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    spawn_cancel_watcher(cancel_tx, args.timeout);

    let outcome = step
        .run_with_sink(TracingSink::labelled(step.name()), cancel_rx)
        .await;

    // Nothing in the executor or hasher emits warnings yet.
    for diagnostic in outcome.diagnostics.warnings() {
        warn!(step = %step.name(), "{}", diagnostic);
    }

    if let Some(ref hashes) = outcome.output_hashes {
        for (path, digest) in step.declared_outputs().iter().zip(hashes) {
            println!("{digest}  {path}");
        }
    }

    let errors: Vec<String> = outcome
        .diagnostics
        .errors()
        .map(|d| d.to_string())
        .collect();
    if !errors.is_empty() {
        bail!("step '{}' failed:\n{}", step.name(), errors.join("\n"));
    }

    info!(step = %step.name(), "done");
    Ok(())
}

/// Build the step to run from the CLI arguments.
///
/// With a command after `--` the step is ad-hoc. Otherwise it comes from the
/// step file, with `--env`, `--working-dir` and `--output` layered on top.
fn resolve_step(args: &CliArgs) -> Result<RunStep> {
    let flag_env: EnvironmentOverlay = args.env.iter().cloned().collect();

    if !args.command.is_empty() {
        let command = CommandSpec::new(args.command.iter().cloned())?;
        let working_dir = WorkingDirectory::new(args.working_dir.clone().unwrap_or_default());
        return Ok(RunStep::new("adhoc", command)
            .environment(flag_env)
            .working_dir(working_dir)
            .outputs(args.outputs.iter().cloned()));
    }

    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading step file {:?}", config_path))?;

    let name = match args.step {
        Some(ref name) => name.clone(),
        None => {
            let names: Vec<&str> = cfg.step_names().collect();
            match names.as_slice() {
                [only] => only.to_string(),
                _ => bail!(
                    "step file {:?} defines several steps ({}); pick one with --step",
                    config_path,
                    names.join(", ")
                ),
            }
        }
    };

    let step = RunStep::from_config(&cfg, &name)?;
    let root_dir = config_root_dir(&config_path);

    let working_dir = match args.working_dir {
        Some(ref dir) => WorkingDirectory::new(dir),
        None => WorkingDirectory::new(root_dir.join(step.work_dir().as_path())),
    };
    let environment = flag_env.layered_over(step.env());
    let outputs = if args.outputs.is_empty() {
        step.declared_outputs().to_vec()
    } else {
        args.outputs.clone()
    };

    debug!(step = %name, ?root_dir, "resolved step from step file");
    Ok(step
        .environment(environment)
        .working_dir(working_dir)
        .outputs(outputs))
}

/// Directory step working directories are relative to.
///
/// - If the config path has a non-empty parent (e.g. "ci/Localrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Localrun.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Fire `cancel_tx` on Ctrl-C or once `timeout` elapses.
fn spawn_cancel_watcher(cancel_tx: oneshot::Sender<()>, timeout: Option<Duration>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        let deadline = async {
            match timeout {
                Some(dur) => tokio::time::sleep(dur).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = ctrl_c => info!("Ctrl+C received; cancelling"),
            () = deadline => warn!(?timeout, "timeout elapsed; cancelling"),
        }
        let _ = cancel_tx.send(());
    });
}

/// Simple dry-run output: print the resolved step.
fn print_dry_run(step: &RunStep) {
    println!("localrun dry-run");
    println!("  step: {}", step.name());
    println!("  mode: {:?}", step.step_mode());
    println!("  command: {:?}", step.command().argv());
    if step.work_dir().is_inherited() {
        println!("  working_dir: (current directory)");
    } else {
        println!("  working_dir: {}", step.work_dir().as_path().display());
    }
    if !step.env().is_empty() {
        println!("  environment:");
        for (key, value) in step.env().iter() {
            println!("    {key}={value}");
        }
    }
    if !step.declared_outputs().is_empty() {
        println!("  outputs: {:?}", step.declared_outputs());
    }

    debug!("dry-run complete (no execution)");
}
