//! Static dataflow analysis over a type-checked schema.
//!
//! One pass over every compilation unit computes definite assignment facts, the X/Z
//! classification of every four-valued variable, and the usage facts code generation
//! needs (visibility, fork capture, aliasing, matcher state, override conflicts).
//!
//! Facts are threaded explicitly: every statement visit takes the current `FlowFacts`
//! and returns the facts after it. Everything that outlives one program point is
//! written into the `AnalysisTable`.

mod access;
pub mod bit_state;
pub mod block_analysis;
mod declarations;
pub mod diagnostics;
mod end_of_pass;
pub mod expr_analysis;
mod expressions;
pub mod flow_facts;
pub(crate) mod operators;
mod overrides;
pub mod records;
pub mod slots;
mod statements;
pub mod types;
mod xz_propagation;

pub use types::{DataflowReport, DataflowStats, VisibilityCeiling, XzSource, XzState};

use crate::compiler_frontend::analysis::dataflow::block_analysis::BlockAnalysis;
use crate::compiler_frontend::analysis::dataflow::diagnostics::AnalysisLog;
use crate::compiler_frontend::analysis::dataflow::records::AnalysisTable;
use crate::compiler_frontend::analysis::dataflow::statements::PendingExit;
use crate::compiler_frontend::schema::schema_nodes::{ClassId, FunctionId, Schema, UnitId, VarId};
use crate::settings::AnalysisConfig;
use crate::timer_log;
use rustc_hash::FxHashMap;
use std::time::Instant;

/// Runs the whole-schema pass.
///
/// Panics when the schema breaks an invariant the analysis relies on. Schemas loaded
/// from outside should go through `schema_from_json`, which validates them first.
pub fn analyze_schema(schema: &Schema, config: &AnalysisConfig) -> DataflowReport {
    DataflowAnalyzer::new(schema, config).run()
}

pub(crate) struct DataflowAnalyzer<'a> {
    schema: &'a Schema,
    config: &'a AnalysisConfig,
    table: AnalysisTable,
    log: AnalysisLog,
    stats: types::DataflowStats,

    // Direct overrides of each function, from the schema's parent links.
    overridden_by: FxHashMap<FunctionId, Vec<FunctionId>>,

    context: FunctionContext,

    // One scope per fork branch being analysed, innermost last.
    fork_scopes: Vec<BlockAnalysis>,

    // Break, continue and return snapshots waiting for their enclosing construct.
    exits: Vec<PendingExit>,

    expr_depth: usize,

    // Depth of an expression whose value is thrown away (expression statements, loop updates).
    discarded_depth: Option<usize>,
}

/// Where the code currently being analysed lives.
#[derive(Debug, Clone, Copy, Default)]
struct FunctionContext {
    function: Option<FunctionId>,
    class: Option<ClassId>,
    unit: Option<UnitId>,

    // Constructors and field initializers.
    in_constructor: bool,
}

impl<'a> DataflowAnalyzer<'a> {
    fn new(schema: &'a Schema, config: &'a AnalysisConfig) -> Self {
        let mut overridden_by: FxHashMap<FunctionId, Vec<FunctionId>> = FxHashMap::default();
        for function in &schema.functions {
            if let Some(parent) = function.overrides {
                overridden_by.entry(parent).or_default().push(function.id);
            }
        }

        Self {
            schema,
            config,
            table: AnalysisTable::new(),
            log: AnalysisLog::new(config.log_indent),
            stats: types::DataflowStats::default(),
            overridden_by,
            context: FunctionContext::default(),
            fork_scopes: Vec::new(),
            exits: Vec::new(),
            expr_depth: 0,
            discarded_depth: None,
        }
    }

    fn run(mut self) -> DataflowReport {
        let started = Instant::now();

        self.log.section("Dataflow analysis");
        for unit in &self.schema.units {
            self.analyze_unit(unit.id);
        }
        self.finish_pass();
        self.log.end_section();

        timer_log!(started, "Dataflow analysis completed in: ");

        DataflowReport {
            table: self.table,
            log: self.log,
            stats: self.stats,
        }
    }

    /// A function and every function that overrides it, directly or not.
    fn override_family(&self, function: FunctionId) -> Vec<FunctionId> {
        let mut family = vec![function];
        let mut index = 0;
        while index < family.len() {
            if let Some(children) = self.overridden_by.get(&family[index]) {
                family.extend(children.iter().copied());
            }
            index += 1;
        }
        family
    }

    fn var_name(&self, var: VarId) -> String {
        let decl = self.schema.variable(var);
        match decl.declaring_class() {
            Some(class) => format!("{}.{}", self.schema.class(class).name, decl.name),
            None => match decl.declaring_function() {
                Some(function) => format!("{}.{}", self.function_name(function), decl.name),
                None => decl.name.clone(),
            },
        }
    }

    fn function_name(&self, function: FunctionId) -> String {
        let decl = self.schema.function(function);
        match decl.class {
            Some(class) => format!("{}::{}", self.schema.class(class).name, decl.name),
            None => decl.name.clone(),
        }
    }

    fn context_name(&self) -> String {
        match self.context.function {
            Some(function) => self.function_name(function),
            None => match self.context.unit {
                Some(unit) => self.schema.unit(unit).path.clone(),
                None => String::from("<schema>"),
            },
        }
    }
}

#[cfg(test)]
mod tests;
