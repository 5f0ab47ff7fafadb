pub mod settings;

pub mod compiler_frontend;
pub mod projects;

pub use compiler_frontend::analysis::dataflow::{
    DataflowReport, DataflowStats, VisibilityCeiling, XzSource, XzState, analyze_schema,
};
pub use compiler_frontend::schema::schema_from_json;
pub use compiler_frontend::{analyze, load_schema};
