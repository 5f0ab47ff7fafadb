//! Tests for CLI command parsing and config resolution.

use super::{AnalyzeOptions, Command, get_command, resolve_config};
use crate::settings::{CONFIG_FILE_NAME, FinalizationPolicy};
use std::fs;
use std::path::PathBuf;

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn analyze_command_uses_default_options() {
    let command = get_command(&args(&["analyze", "design.json"])).expect("command should parse");
    assert_eq!(
        command,
        Command::Analyze {
            schema: PathBuf::from("design.json"),
            options: AnalyzeOptions::default(),
        }
    );
}

#[test]
fn analyze_command_parses_every_flag() {
    let command = get_command(&args(&[
        "analyze",
        "design.json",
        "--config",
        "custom.toml",
        "--strict",
        "--log",
    ]))
    .expect("command should parse");

    assert_eq!(
        command,
        Command::Analyze {
            schema: PathBuf::from("design.json"),
            options: AnalyzeOptions {
                config: Some(PathBuf::from("custom.toml")),
                strict: true,
                show_log: true,
            },
        }
    );
}

#[test]
fn analyze_command_requires_a_schema_path() {
    let error = get_command(&args(&["analyze", "--strict"])).expect_err("missing schema");
    assert!(error.contains("Missing schema path"));
}

#[test]
fn analyze_command_rejects_unknown_flags_and_extra_paths() {
    let error = get_command(&args(&["analyze", "a.json", "--fast"])).expect_err("unknown flag");
    assert!(error.contains("Unknown analyze flag"));

    let error = get_command(&args(&["analyze", "a.json", "b.json"])).expect_err("two paths");
    assert!(error.contains("exactly one schema path"));

    let error = get_command(&args(&["analyze", "a.json", "--config"])).expect_err("no value");
    assert!(error.contains("Missing value for --config"));
}

#[test]
fn analyze_command_only_takes_json_schemas() {
    let error = get_command(&args(&["analyze", "design.toml"])).expect_err("not json");
    assert!(error.contains("should be a .json file"));
}

#[test]
fn unknown_commands_are_rejected() {
    let error = get_command(&args(&["build"])).expect_err("not a command");
    assert!(error.contains("Invalid command"));
}

#[test]
fn config_next_to_the_schema_is_picked_up_and_flags_override_it() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "emit_log = false\nlog_indent = 4\n",
    )
    .expect("write config");
    let schema = dir.path().join("design.json");

    let config = resolve_config(&schema, &AnalyzeOptions::default()).expect("config loads");
    assert_eq!(config.log_indent, 4);
    assert_eq!(config.finalization, FinalizationPolicy::DefaultNotXz);

    let options = AnalyzeOptions {
        config: None,
        strict: true,
        show_log: true,
    };
    let config = resolve_config(&schema, &options).expect("config loads");
    assert_eq!(config.finalization, FinalizationPolicy::Strict);
    assert!(config.emit_log);
    assert_eq!(config.log_indent, 4);
}
