// src/cli.rs

//! CLI argument parsing using `clap`.

use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `localrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "localrun",
    version,
    about = "Run a local command as a build step and report hashes of its outputs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the step file (TOML).
    ///
    /// Default: `Localrun.toml` in the current working directory. Ignored when
    /// a command is given after `--`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Step to run from the step file. Required if the file has more than one.
    #[arg(long, value_name = "NAME")]
    pub step: Option<String>,

    /// Working directory to run in. Overrides the step's `working_dir`.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<String>,

    /// Extra environment variable, layered over the step's (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,

    /// Output file to hash after the command succeeds (repeatable).
    ///
    /// Replaces the step's declared outputs when given.
    #[arg(long = "output", value_name = "PATH")]
    pub outputs: Vec<String>,

    /// Stop waiting for the command after this long (e.g. `500ms`, `30s`, `2m`).
    ///
    /// The command itself is left running.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOCALRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the step, but don't execute it.
    #[arg(long)]
    pub dry_run: bool,

    /// Ad-hoc command to run instead of a step from the step file.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse durations like `500ms`, `3s`, `2m`, `1h`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
