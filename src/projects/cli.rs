//! Command-line entrypoint for the dataflow analyzer.
//!
//! Parses the command, resolves the analysis config and prints the results.

use crate::compiler_frontend::analysis::dataflow::DataflowReport;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::display_messages::print_compiler_messages;
use crate::compiler_frontend::schema::schema_nodes::Schema;
use crate::compiler_frontend::{analyze, load_schema};
use crate::settings::{
    AnalysisConfig, CONFIG_FILE_NAME, FinalizationPolicy, SCHEMA_FILE_EXTENSION, load_config,
};
use crate::timer_log;
use saying::say;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Analyze {
        schema: PathBuf,
        options: AnalyzeOptions,
    },

    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct AnalyzeOptions {
    // Overrides the config found next to the schema
    config: Option<PathBuf>,

    strict: bool,
    show_log: bool,
}

pub fn start_cli() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    match command {
        Command::Help => print_help(false),

        Command::Analyze { schema, options } => {
            if let Err(error) = run_analysis(&schema, &options) {
                print_compiler_messages(CompilerMessages::from_error(error));
            }
        }
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") | Some("--help") => Ok(Command::Help),
        Some("analyze") => parse_analyze_command(args),
        Some(other) => Err(format!("Invalid command: '{other}'")),
        None => Err(String::from("Missing command")),
    }
}

fn parse_analyze_command(args: &[String]) -> Result<Command, String> {
    let mut schema: Option<PathBuf> = None;
    let mut options = AnalyzeOptions::default();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --config"));
                };
                if path.starts_with("--") {
                    return Err(String::from("Missing value for --config"));
                }
                options.config = Some(PathBuf::from(path));
                index += 2;
            }
            "--strict" => {
                options.strict = true;
                index += 1;
            }
            "--log" => {
                options.show_log = true;
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!(
                    "Unknown analyze flag: '{arg}'. Supported flags are --config, --strict, --log."
                ));
            }
            _ => {
                if schema.is_some() {
                    return Err(String::from(
                        "Analyze command accepts exactly one schema path.",
                    ));
                }
                schema = Some(PathBuf::from(arg));
                index += 1;
            }
        }
    }

    let Some(schema) = schema else {
        return Err(String::from("Missing schema path for analyze"));
    };

    if schema.extension().and_then(|ext| ext.to_str()) != Some(SCHEMA_FILE_EXTENSION) {
        return Err(format!(
            "Schema path '{}' should be a .{SCHEMA_FILE_EXTENSION} file",
            schema.display()
        ));
    }

    Ok(Command::Analyze { schema, options })
}

/// An explicit --config wins. Otherwise a config file sitting next to the schema
/// is used when there is one.
fn resolve_config(schema: &Path, options: &AnalyzeOptions) -> Result<AnalysisConfig, CompilerError> {
    let mut config = match &options.config {
        Some(path) => load_config(path)?,
        None => {
            let beside_schema = schema
                .parent()
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .filter(|path| path.is_file());
            match beside_schema {
                Some(path) => load_config(&path)?,
                None => AnalysisConfig::default(),
            }
        }
    };

    if options.strict {
        config.finalization = FinalizationPolicy::Strict;
    }
    if options.show_log {
        config.emit_log = true;
    }

    Ok(config)
}

fn run_analysis(schema_path: &Path, options: &AnalyzeOptions) -> Result<(), CompilerError> {
    let start = Instant::now();

    let config = resolve_config(schema_path, options)?;
    let schema = load_schema(schema_path)?;
    let report = analyze(&schema, &config)?;

    print_summary(&schema, &report);
    if config.emit_log {
        say!(Bright Black "------------------------------------");
        say!(report.log.render());
    }

    timer_log!(start, "Analysed in: ");
    Ok(())
}

fn print_summary(schema: &Schema, report: &DataflowReport) {
    let stats = &report.stats;

    say!(Green Bold "Dataflow analysis complete");
    say!(
        "  ",
        {stats.functions_analyzed},
        " functions, ",
        {stats.classes_analyzed},
        " classes, ",
        {stats.variables_tracked},
        " variables"
    );

    let xz_capable = report
        .table
        .variable_ids()
        .into_iter()
        .filter(|var| report.can_be_xz(*var))
        .collect::<Vec<_>>();

    if xz_capable.is_empty() {
        say!("  No variable can hold X/Z");
    } else {
        say!(Yellow "  Can hold X/Z:");
        for var in xz_capable {
            let source = report
                .variable(var)
                .and_then(|record| record.xz_source())
                .map(|source| source.to_string())
                .unwrap_or_default();
            say!("    ", {schema.variable(var).name.as_str()}, Bright Black " (", source, ")");
        }
    }

    let read_unassigned = report
        .table
        .variable_ids()
        .into_iter()
        .filter(|var| report.is_read_when_unassigned(*var))
        .collect::<Vec<_>>();

    if !read_unassigned.is_empty() {
        say!(Yellow "  Read before assignment:");
        for var in read_unassigned {
            say!("    ", {schema.variable(var).name.as_str()});
        }
    }
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "hvlflow: static dataflow analysis for HVL schemas");
        say!("Usage: ", Bold "<command>", Italic " <args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  analyze <schema.json>   - Runs the dataflow pass over a schema");
    say!("  help                    - Shows this message");

    say!(Green Bold "\nFlags:");
    say!("  --config <file.toml>    (default: ", CONFIG_FILE_NAME, " next to the schema)");
    say!("  --strict                Fail when any X/Z state is left undecided");
    say!("  --log                   Print the diagnostic log");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
