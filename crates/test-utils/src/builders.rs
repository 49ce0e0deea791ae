#![allow(dead_code)]

use std::collections::BTreeMap;

use localrun::config::{ConfigFile, DefaultSection, RawConfigFile, StepConfig};
use localrun::types::StepMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                default: DefaultSection::default(),
                step: BTreeMap::new(),
            },
        }
    }

    pub fn with_step(mut self, name: &str, step: StepConfig) -> Self {
        self.config.step.insert(name.to_string(), step);
        self
    }

    pub fn with_default_env(mut self, key: &str, value: &str) -> Self {
        self.config
            .default
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_default_working_dir(mut self, dir: &str) -> Self {
        self.config.default.working_dir = Some(dir.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StepConfig`.
pub struct StepConfigBuilder {
    step: StepConfig,
}

impl StepConfigBuilder {
    pub fn new(command: &[&str]) -> Self {
        Self {
            step: StepConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                environment: BTreeMap::new(),
                working_dir: None,
                outputs: Vec::new(),
                mode: StepMode::Resource,
            },
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.step
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn working_dir(mut self, dir: &str) -> Self {
        self.step.working_dir = Some(dir.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.step.outputs.push(path.to_string());
        self
    }

    pub fn mode(mut self, mode: StepMode) -> Self {
        self.step.mode = mode;
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}
