pub(crate) mod compiler_messages {
    pub(crate) mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod display_messages;
}
pub use compiler_messages::compiler_errors;
pub use compiler_messages::display_messages;

pub mod analysis {
    pub mod dataflow;
}

pub mod schema;

use crate::compiler_frontend::analysis::dataflow::{DataflowReport, analyze_schema};
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey};
use crate::compiler_frontend::schema::schema_from_json;
use crate::compiler_frontend::schema::schema_nodes::Schema;
use crate::return_file_error;
use crate::settings::AnalysisConfig;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

// -----------------------------
//        SCHEMA LOADING
// -----------------------------
/// Reads a JSON schema dump from disk and checks it is well formed before
/// anything trusts its ids.
pub fn load_schema(path: &Path) -> Result<Schema, CompilerError> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            return_file_error!(path, format!("Couldn't read schema file: {err}"), {
                CompilationStage => "Schema Loading",
            });
        }
    };

    schema_from_json(&source, path)
}

// -----------------------------
//        DATAFLOW PASS
// -----------------------------
/// Runs the whole-schema analysis.
///
/// The pass itself panics on broken invariants (and on unresolved X/Z in strict mode).
/// Here that becomes a compiler error so the CLI can report it like any other.
pub fn analyze(schema: &Schema, config: &AnalysisConfig) -> Result<DataflowReport, CompilerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| analyze_schema(schema, config))) {
        Ok(report) => Ok(report),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| payload.downcast_ref::<&str>().map(|text| text.to_string()))
                .unwrap_or_else(|| String::from("unknown panic"));

            let mut error =
                CompilerError::compiler_error(format!("Dataflow analysis aborted: {reason}"));
            error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "Dataflow Analysis");
            Err(error)
        }
    }
}
