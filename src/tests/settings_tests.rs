//! Tests for loading the analysis config.

use super::{AnalysisConfig, DEFAULT_LOG_INDENT, FinalizationPolicy, load_config};
use crate::compiler_frontend::compiler_errors::ErrorType;
use std::fs;
use std::path::Path;

#[test]
fn empty_config_uses_defaults() {
    let config = AnalysisConfig::from_toml("", Path::new("hvlflow.toml")).expect("parses");
    assert_eq!(config, AnalysisConfig::default());
    assert_eq!(config.log_indent, DEFAULT_LOG_INDENT);
    assert_eq!(config.finalization, FinalizationPolicy::DefaultNotXz);
}

#[test]
fn every_key_is_read() {
    let source = r#"
finalization = "strict"
emit_log = true
log_indent = 4
report_unresolved = true
"#;
    let config = AnalysisConfig::from_toml(source, Path::new("hvlflow.toml")).expect("parses");

    assert_eq!(config.finalization, FinalizationPolicy::Strict);
    assert!(config.emit_log);
    assert_eq!(config.log_indent, 4);
    assert!(config.report_unresolved);
}

#[test]
fn unknown_keys_are_config_errors() {
    let error = AnalysisConfig::from_toml("colour = true", Path::new("hvlflow.toml"))
        .expect_err("unknown key");
    assert_eq!(error.error_type, ErrorType::Config);
    assert!(error.msg.contains("Couldn't parse analysis config"));
}

#[test]
fn oversized_indent_is_rejected() {
    let error = AnalysisConfig::from_toml("log_indent = 40", Path::new("hvlflow.toml"))
        .expect_err("indent too large");
    assert_eq!(error.error_type, ErrorType::Config);
    assert!(error.msg.contains("log_indent"));
}

#[test]
fn load_config_reads_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("hvlflow.toml");
    fs::write(&path, "finalization = \"default_not_xz\"\nemit_log = true\n").expect("write");

    let config = load_config(&path).expect("loads");
    assert!(config.emit_log);
    assert_eq!(config.finalization, FinalizationPolicy::DefaultNotXz);
}

#[test]
fn missing_config_file_is_a_file_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = load_config(&dir.path().join("absent.toml")).expect_err("missing file");
    assert_eq!(error.error_type, ErrorType::File);
}
