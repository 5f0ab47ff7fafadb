mod class;
mod function;
mod variable;

pub use class::ClassAnalysis;
pub use function::FunctionAnalysis;
pub use variable::VariableAnalysis;

use crate::compiler_frontend::schema::schema_nodes::{ClassId, FunctionId, Schema, VarId};
use rustc_hash::FxHashMap;

/// Owner of every analysis record for the run.
///
/// Records are created on first reference and never removed. Cross references between
/// records (X/Z edges, aliases, override links) are ids into this table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisTable {
    variables: FxHashMap<VarId, VariableAnalysis>,
    functions: FxHashMap<FunctionId, FunctionAnalysis>,
    classes: FxHashMap<ClassId, ClassAnalysis>,
}

impl AnalysisTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, var: VarId) -> Option<&VariableAnalysis> {
        self.variables.get(&var)
    }

    pub fn function(&self, function: FunctionId) -> Option<&FunctionAnalysis> {
        self.functions.get(&function)
    }

    pub fn class(&self, class: ClassId) -> Option<&ClassAnalysis> {
        self.classes.get(&class)
    }

    pub(crate) fn ensure_variable(&mut self, schema: &Schema, var: VarId) -> &mut VariableAnalysis {
        self.variables
            .entry(var)
            .or_insert_with(|| VariableAnalysis::for_decl(schema.variable(var), schema))
    }

    pub(crate) fn ensure_function(
        &mut self,
        schema: &Schema,
        function: FunctionId,
    ) -> &mut FunctionAnalysis {
        self.functions.entry(function).or_insert_with(|| {
            FunctionAnalysis::new(function, schema.function(function).params.len())
        })
    }

    pub(crate) fn ensure_class(&mut self, class: ClassId) -> &mut ClassAnalysis {
        self.classes
            .entry(class)
            .or_insert_with(|| ClassAnalysis::new(class))
    }

    /// Panics when the variable was never referenced. Only for nodes already in the graph.
    pub(crate) fn variable_mut(&mut self, var: VarId) -> &mut VariableAnalysis {
        match self.variables.get_mut(&var) {
            Some(record) => record,
            None => panic!("{var} has no analysis record"),
        }
    }

    pub(crate) fn class_mut(&mut self, class: ClassId) -> &mut ClassAnalysis {
        self.ensure_class(class)
    }

    /// Referenced variables in id order.
    pub fn variable_ids(&self) -> Vec<VarId> {
        let mut ids = self.variables.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn function_ids(&self) -> Vec<FunctionId> {
        let mut ids = self.functions.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn class_ids(&self) -> Vec<ClassId> {
        let mut ids = self.classes.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn variables(&self) -> impl Iterator<Item = &VariableAnalysis> {
        self.variables.values()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}
