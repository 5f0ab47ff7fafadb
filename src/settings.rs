use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorLocation};
use crate::{return_config_error, return_file_error};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "hvlflow.toml";
pub const SCHEMA_FILE_EXTENSION: &str = "json";
pub const DEFAULT_LOG_INDENT: usize = 2;

// Rough guesses to avoid early reallocations. Not tuned against real schemas yet.
pub const EXPECTED_VARIABLES_PER_FUNCTION: usize = 16;
pub const EXPECTED_FORK_BRANCHES: usize = 4;

/// What happens to variables whose X/Z status is still undecided after the whole pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizationPolicy {
    /// Resolve them to "not X/Z".
    #[default]
    DefaultNotXz,

    /// Every variable must be decided. Anything left over is an analysis bug.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub finalization: FinalizationPolicy,

    /// Print the diagnostic log after the summary.
    pub emit_log: bool,

    /// Spaces per log indentation level.
    pub log_indent: usize,

    /// Log every variable the finalization policy had to decide.
    pub report_unresolved: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            finalization: FinalizationPolicy::DefaultNotXz,
            emit_log: false,
            log_indent: DEFAULT_LOG_INDENT,
            report_unresolved: false,
        }
    }
}

impl AnalysisConfig {
    pub fn strict() -> Self {
        AnalysisConfig {
            finalization: FinalizationPolicy::Strict,
            ..AnalysisConfig::default()
        }
    }

    pub fn from_toml(source: &str, path: &Path) -> Result<Self, CompilerError> {
        match toml::from_str::<AnalysisConfig>(source) {
            Ok(config) => {
                if config.log_indent > 16 {
                    return_config_error!(
                        format!("log_indent of {} is too large", config.log_indent),
                        ErrorLocation::in_file(path),
                        { PrimarySuggestion => "Use an indent between 0 and 16" }
                    );
                }
                Ok(config)
            }
            Err(err) => {
                return_config_error!(
                    format!("Couldn't parse analysis config: {err}"),
                    ErrorLocation::in_file(path),
                    {
                        CompilationStage => "Config Loading",
                        PrimarySuggestion => "Valid keys are finalization, emit_log, log_indent and report_unresolved",
                    }
                );
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<AnalysisConfig, CompilerError> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            return_file_error!(path, format!("Couldn't read config file: {err}"));
        }
    };

    AnalysisConfig::from_toml(&source, path)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
