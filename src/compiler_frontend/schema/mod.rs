pub mod schema_builder;
pub mod schema_nodes;
pub(crate) mod schema_validation;

use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorLocation};
use crate::compiler_frontend::schema::schema_nodes::Schema;
use crate::return_schema_error;
use std::path::Path;

/// Parse a JSON schema dump and check it is well formed.
pub fn schema_from_json(source: &str, path: &Path) -> Result<Schema, CompilerError> {
    let schema: Schema = match serde_json::from_str(source) {
        Ok(schema) => schema,
        Err(err) => {
            return_schema_error!(
                format!("Couldn't parse schema JSON: {err}"),
                ErrorLocation::new(Some(path.to_path_buf()), Some(format!("line {}", err.line()))),
                { CompilationStage => "Schema Loading" }
            );
        }
    };

    schema_validation::validate_schema(&schema).map_err(|e| e.with_file_path(path.to_path_buf()))?;
    Ok(schema)
}
