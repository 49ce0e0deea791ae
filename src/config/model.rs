// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::StepMode;

/// Step file as read from TOML, before validation.
///
/// ```toml
/// [default]
/// working_dir = "build"
///
/// [default.environment]
/// RUST_LOG = "info"
///
/// [step.codegen]
/// command = ["protoc", "--rust_out=gen", "api.proto"]
/// outputs = ["gen/api.rs"]
/// mode = "resource"
/// ```
///
/// Use `ConfigFile::try_from` (or [`crate::config::load_and_validate`]) to
/// get a validated config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Values shared by every step, from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All steps from `[step.<name>]`, keyed by step name.
    #[serde(default)]
    pub step: BTreeMap<String, StepConfig>,
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultSection {
    /// Applied beneath each step's own `environment`; the step wins.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Used by steps that don't set `working_dir`.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// `[step.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Command to run; first element is the executable, remaining elements
    /// are arguments.
    pub command: Vec<String>,

    /// Environment variables layered over the inherited environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Working directory for the command; defaults to `[default].working_dir`,
    /// then to the current directory.
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Files produced by the command, relative to the working directory
    /// unless absolute. Their hashes are reported after execution.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub mode: StepMode,
}

impl StepConfig {
    /// Effective working directory given `[default]`.
    pub fn effective_working_dir<'a>(&'a self, defaults: &'a DefaultSection) -> &'a str {
        self.working_dir
            .as_deref()
            .or(defaults.working_dir.as_deref())
            .unwrap_or("")
    }
}

/// Validated step file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub default: DefaultSection,
    pub step: BTreeMap<String, StepConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        default: DefaultSection,
        step: BTreeMap<String, StepConfig>,
    ) -> Self {
        Self { default, step }
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.step.keys().map(String::as_str)
    }
}
