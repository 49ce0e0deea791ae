// src/types.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::{LocalrunError, Result};

/// Digest value recorded for an output file that could not be read.
pub const HASH_ERROR: &str = "error";

/// Program plus positional arguments. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        if argv.is_empty() {
            return Err(LocalrunError::ConfigError(
                "command must contain at least one element".to_string(),
            ));
        }
        Ok(Self { argv })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

/// Variables applied on top of the inherited environment of the child.
///
/// Keys are unique; the overlay wins over an inherited value of the same name.
/// The parent's own environment is never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvironmentOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Layer `self` on top of `base`; keys in `self` win.
    pub fn layered_over(&self, base: &EnvironmentOverlay) -> EnvironmentOverlay {
        let mut vars = base.vars.clone();
        vars.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        EnvironmentOverlay { vars }
    }
}

impl From<BTreeMap<String, String>> for EnvironmentOverlay {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K, V> FromIterator<(K, V)> for EnvironmentOverlay
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Directory the command runs in and relative outputs are resolved against.
///
/// An empty path means "inherit the current working directory".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingDirectory(PathBuf);

impl WorkingDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn inherit() -> Self {
        Self::default()
    }

    pub fn is_inherited(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for WorkingDirectory {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How a step reacts to lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Run once when the step is created; read/update/delete are no-ops.
    Resource,
    /// Run unconditionally every time the step is read. For actions with
    /// dependencies the caller does not track, like a Makefile.
    AlwaysRun,
}

impl Default for StepMode {
    fn default() -> Self {
        StepMode::Resource
    }
}

impl FromStr for StepMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "resource" => Ok(StepMode::Resource),
            "always_run" => Ok(StepMode::AlwaysRun),
            other => Err(format!(
                "invalid step mode: {other} (expected \"resource\" or \"always_run\")"
            )),
        }
    }
}
