// tests/config_loading.rs

use std::error::Error;
use std::io::Write;

use tempfile::NamedTempFile;

use localrun::config::{load_and_validate, ConfigFile};
use localrun::errors::LocalrunError;
use localrun::step::RunStep;
use localrun::types::{StepMode, WorkingDirectory};
use localrun_test_utils::builders::{ConfigFileBuilder, StepConfigBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn loads_steps_with_defaults() -> TestResult {
    let file = write_config(
        r#"
[default]
working_dir = "build"

[default.environment]
SHARED = "yes"
MODE = "default"

[step.codegen]
command = ["protoc", "--rust_out=gen", "api.proto"]
outputs = ["gen/api.rs"]

[step.codegen.environment]
MODE = "step"

[step.make]
command = ["make"]
working_dir = "native"
mode = "always_run"
"#,
    );

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.step_names().collect::<Vec<_>>(), vec!["codegen", "make"]);

    let codegen = RunStep::from_config(&cfg, "codegen")?;
    assert_eq!(codegen.command().program(), "protoc");
    assert_eq!(codegen.command().args(), ["--rust_out=gen", "api.proto"]);
    assert_eq!(codegen.env().get("SHARED"), Some("yes"));
    assert_eq!(codegen.env().get("MODE"), Some("step"));
    assert_eq!(codegen.work_dir(), &WorkingDirectory::new("build"));
    assert_eq!(codegen.declared_outputs(), ["gen/api.rs"]);
    assert_eq!(codegen.step_mode(), StepMode::Resource);

    let make = RunStep::from_config(&cfg, "make")?;
    assert_eq!(make.work_dir(), &WorkingDirectory::new("native"));
    assert_eq!(make.step_mode(), StepMode::AlwaysRun);
    Ok(())
}

#[test]
fn empty_command_returns_config_error() {
    let file = write_config(
        r#"
[step.nothing]
command = []
"#,
    );

    match load_and_validate(file.path()) {
        Err(LocalrunError::ConfigError(msg)) => {
            assert!(msg.contains("empty `command`"));
            assert!(msg.contains("nothing"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn file_without_steps_is_rejected() {
    let file = write_config("[default]\nworking_dir = \"x\"\n");

    match load_and_validate(file.path()) {
        Err(LocalrunError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn unknown_fields_and_modes_are_toml_errors() {
    let typo = write_config("[step.a]\ncommand = [\"true\"]\noutput = [\"x\"]\n");
    assert!(matches!(
        load_and_validate(typo.path()),
        Err(LocalrunError::TomlError(_))
    ));

    let bad_mode = write_config("[step.a]\ncommand = [\"true\"]\nmode = \"sometimes\"\n");
    assert!(matches!(
        load_and_validate(bad_mode.path()),
        Err(LocalrunError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Localrun.toml"),
        Err(LocalrunError::IoError(_))
    ));
}

#[test]
fn invalid_environment_names_are_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_step("a", StepConfigBuilder::new(&["true"]).env("BAD=NAME", "v").build())
        .build_raw();

    match ConfigFile::try_from(raw) {
        Err(LocalrunError::ConfigError(msg)) => assert!(msg.contains("BAD=NAME")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn blank_program_and_outputs_are_rejected() {
    let blank_program = ConfigFileBuilder::new()
        .with_step("a", StepConfigBuilder::new(&["  "]).build())
        .build_raw();
    assert!(matches!(
        ConfigFile::try_from(blank_program),
        Err(LocalrunError::ConfigError(_))
    ));

    let blank_output = ConfigFileBuilder::new()
        .with_step("a", StepConfigBuilder::new(&["true"]).output("").build())
        .build_raw();
    assert!(matches!(
        ConfigFile::try_from(blank_output),
        Err(LocalrunError::ConfigError(_))
    ));
}

#[test]
fn unknown_step_is_step_not_found() {
    let cfg = ConfigFileBuilder::new()
        .with_default_env("A", "1")
        .with_default_working_dir("w")
        .with_step("build", StepConfigBuilder::new(&["make"]).output("out").build())
        .build();

    match RunStep::from_config(&cfg, "deploy") {
        Err(LocalrunError::StepNotFound(name)) => assert_eq!(name, "deploy"),
        other => panic!("Expected StepNotFound, got: {:?}", other),
    }

    let build = RunStep::from_config(&cfg, "build").unwrap();
    assert_eq!(build.env().get("A"), Some("1"));
    assert_eq!(build.work_dir(), &WorkingDirectory::new("w"));
}
