// src/step/mod.rs

//! Lifecycle adapter around the executor and the output hasher.
//!
//! A [`RunStep`] is one declared "run a local command" step. The caller drives
//! it through [`Transition`]s; only the apply transition for its [`StepMode`]
//! touches the core (create for a resource, read for an always-run step).
//! Whether a step *should* be re-created is the caller's business.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::{ConfigFile, DefaultSection, StepConfig};
use crate::diagnostics::Diagnostics;
use crate::errors::{ExecutionError, LocalrunError, Result};
use crate::exec::{Executor, OutputSink, TracingSink};
use crate::fs::RealFileSystem;
use crate::hash::hash_outputs_blocking;
use crate::types::{CommandSpec, EnvironmentOverlay, StepMode, WorkingDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Read,
    Update,
    Delete,
}

impl StepMode {
    /// Whether `transition` runs the command for a step in this mode.
    pub fn executes_on(self, transition: Transition) -> bool {
        matches!(
            (self, transition),
            (StepMode::Resource, Transition::Create) | (StepMode::AlwaysRun, Transition::Read)
        )
    }
}

/// Result of driving a step through one transition.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// Whether the command was run at all.
    pub executed: bool,
    /// One digest per declared output, in order. `None` if the command was
    /// not run or did not succeed.
    pub output_hashes: Option<Vec<String>>,
    pub diagnostics: Diagnostics,
}

impl StepOutcome {
    fn skipped() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct RunStep {
    name: String,
    command: CommandSpec,
    environment: EnvironmentOverlay,
    working_dir: WorkingDirectory,
    outputs: Vec<String>,
    mode: StepMode,
}

impl RunStep {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            environment: EnvironmentOverlay::new(),
            working_dir: WorkingDirectory::inherit(),
            outputs: Vec::new(),
            mode: StepMode::default(),
        }
    }

    pub fn environment(mut self, environment: EnvironmentOverlay) -> Self {
        self.environment = environment;
        self
    }

    pub fn working_dir(mut self, working_dir: WorkingDirectory) -> Self {
        self.working_dir = working_dir;
        self
    }

    pub fn outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn mode(mut self, mode: StepMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build a step from a `[step.<name>]` section, applying `[default]`.
    pub fn from_step_config(
        name: &str,
        step: &StepConfig,
        defaults: &DefaultSection,
    ) -> Result<Self> {
        let command = CommandSpec::new(step.command.iter().cloned())?;
        let base = EnvironmentOverlay::from(defaults.environment.clone());
        let environment = EnvironmentOverlay::from(step.environment.clone()).layered_over(&base);

        Ok(Self::new(name, command)
            .environment(environment)
            .working_dir(WorkingDirectory::new(step.effective_working_dir(defaults)))
            .outputs(step.outputs.iter().cloned())
            .mode(step.mode))
    }

    /// Look up `name` in a validated step file.
    pub fn from_config(cfg: &ConfigFile, name: &str) -> Result<Self> {
        let step = cfg
            .step
            .get(name)
            .ok_or_else(|| LocalrunError::StepNotFound(name.to_string()))?;
        Self::from_step_config(name, step, &cfg.default)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn env(&self) -> &EnvironmentOverlay {
        &self.environment
    }

    pub fn work_dir(&self) -> &WorkingDirectory {
        &self.working_dir
    }

    pub fn declared_outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn step_mode(&self) -> StepMode {
        self.mode
    }

    /// Drive the step through `transition`.
    ///
    /// Runs the command (streaming output through `tracing`) only when the
    /// step's mode applies on this transition; otherwise nothing happens.
    pub async fn apply(&self, transition: Transition, cancel: oneshot::Receiver<()>) -> StepOutcome {
        if !self.mode.executes_on(transition) {
            debug!(step = %self.name, ?transition, mode = ?self.mode, "transition is a no-op");
            return StepOutcome::skipped();
        }
        self.run_with_sink(TracingSink::labelled(&self.name), cancel)
            .await
    }

    /// Execute the command, then hash the declared outputs if it succeeded.
    pub async fn run_with_sink<S: OutputSink>(
        &self,
        sink: S,
        cancel: oneshot::Receiver<()>,
    ) -> StepOutcome {
        let mut diagnostics = Diagnostics::new();

        let result = Executor::with_sink(sink)
            .execute(&self.command, &self.environment, &self.working_dir, cancel)
            .await;

        if let Err(err) = result {
            let (summary, detail) = match &err {
                ExecutionError::PipeSetup(source) => {
                    ("Failed to initialize pipe for output", source.to_string())
                }
                ExecutionError::CommandFailed { .. } => ("Run failed", err.to_string()),
                ExecutionError::Cancelled { .. } => ("Run cancelled", err.to_string()),
            };
            diagnostics.add_error(summary, detail);
            return StepOutcome {
                executed: true,
                output_hashes: None,
                diagnostics,
            };
        }

        let (hashes, hash_diagnostics) = hash_outputs_blocking(
            Arc::new(RealFileSystem),
            self.working_dir.clone(),
            self.outputs.clone(),
        )
        .await;
        diagnostics.extend(hash_diagnostics);
        info!(
            step = %self.name,
            outputs = hashes.len(),
            errors = diagnostics.errors().count(),
            "step applied"
        );

        StepOutcome {
            executed: true,
            output_hashes: Some(hashes),
            diagnostics,
        }
    }
}
