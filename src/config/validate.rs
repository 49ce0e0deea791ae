// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LocalrunError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::LocalrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.default, raw.step))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_steps(cfg)?;
    validate_environment("[default].environment", cfg.default.environment.keys())?;
    validate_steps(cfg)?;
    Ok(())
}

fn ensure_has_steps(cfg: &RawConfigFile) -> Result<()> {
    if cfg.step.is_empty() {
        return Err(LocalrunError::ConfigError(
            "config must contain at least one [step.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_steps(cfg: &RawConfigFile) -> Result<()> {
    for (name, step) in cfg.step.iter() {
        match step.command.first() {
            None => {
                return Err(LocalrunError::ConfigError(format!(
                    "step '{}' has an empty `command`",
                    name
                )));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(LocalrunError::ConfigError(format!(
                    "step '{}' has a blank executable in `command`",
                    name
                )));
            }
            Some(_) => {}
        }

        if step.outputs.iter().any(|o| o.trim().is_empty()) {
            return Err(LocalrunError::ConfigError(format!(
                "step '{}' has a blank entry in `outputs`",
                name
            )));
        }

        validate_environment(
            &format!("[step.{}].environment", name),
            step.environment.keys(),
        )?;
    }
    Ok(())
}

fn validate_environment<'a>(
    section: &str,
    mut keys: impl Iterator<Item = &'a String>,
) -> Result<()> {
    if let Some(bad) = keys.find(|k| k.is_empty() || k.contains('=') || k.contains('\0')) {
        return Err(LocalrunError::ConfigError(format!(
            "{} has invalid variable name {:?}",
            section, bad
        )));
    }
    Ok(())
}
