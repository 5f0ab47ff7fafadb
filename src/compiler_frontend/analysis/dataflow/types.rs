use crate::compiler_frontend::analysis::dataflow::diagnostics::AnalysisLog;
use crate::compiler_frontend::analysis::dataflow::records::{
    AnalysisTable, ClassAnalysis, FunctionAnalysis, VariableAnalysis,
};
use crate::compiler_frontend::schema::schema_nodes::{ClassId, FunctionId, VarId};
use std::fmt;

/// Why a variable was classified as able to hold X or Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XzSource {
    /// A sized literal with x or z digits.
    XzLiteral,

    /// Read before it was definitely assigned. Uninitialised four-valued storage is X.
    UninitializedRead,

    /// Inherited from another variable through an assignment, argument or return value.
    Assignment,

    /// Return value of a built-in annotated as X/Z capable.
    BuiltinReturn,

    /// Parameter of a built-in annotated as X/Z capable.
    BuiltinArgument,
}

impl fmt::Display for XzSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            XzSource::XzLiteral => "x/z literal",
            XzSource::UninitializedRead => "uninitialized read",
            XzSource::Assignment => "assignment",
            XzSource::BuiltinReturn => "built-in return",
            XzSource::BuiltinArgument => "built-in argument",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XzState {
    #[default]
    Unknown,
    AssignedXz {
        source: XzSource,
        origin: Option<VarId>,
    },
    NotAssignedXz,
}

impl XzState {
    pub fn is_unknown(self) -> bool {
        matches!(self, XzState::Unknown)
    }

    pub fn is_assigned_xz(self) -> bool {
        matches!(self, XzState::AssignedXz { .. })
    }
}

/// The narrowest visibility a field can be generated with, given where it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VisibilityCeiling {
    Private,
    Package,
    Protected,
    Public,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataflowStats {
    pub units_analyzed: usize,
    pub classes_analyzed: usize,
    pub functions_analyzed: usize,
    pub statements_analyzed: usize,
    pub expressions_analyzed: usize,
    pub loop_second_passes: usize,
    pub forks_analyzed: usize,
    pub variables_tracked: usize,
    pub xz_assigned: usize,
    pub xz_not_assigned: usize,
    pub xz_defaulted: usize,
}

/// Everything the pass learned, keyed by declaration.
#[derive(Debug, Clone, Default)]
pub struct DataflowReport {
    pub table: AnalysisTable,
    pub log: AnalysisLog,
    pub stats: DataflowStats,
}

impl DataflowReport {
    pub fn variable(&self, var: VarId) -> Option<&VariableAnalysis> {
        self.table.variable(var)
    }

    pub fn function(&self, function: FunctionId) -> Option<&FunctionAnalysis> {
        self.table.function(function)
    }

    pub fn class(&self, class: ClassId) -> Option<&ClassAnalysis> {
        self.table.class(class)
    }

    /// Variables never referenced have no record and can't hold X/Z.
    pub fn can_be_xz(&self, var: VarId) -> bool {
        self.variable(var).is_some_and(VariableAnalysis::can_be_xz)
    }

    pub fn xz_state(&self, var: VarId) -> XzState {
        self.variable(var)
            .map(VariableAnalysis::xz_state)
            .unwrap_or(XzState::NotAssignedXz)
    }

    pub fn is_read_when_unassigned(&self, var: VarId) -> bool {
        self.variable(var)
            .is_some_and(VariableAnalysis::is_read_when_unassigned)
    }

    pub fn is_written_when_assigned(&self, var: VarId) -> bool {
        self.variable(var)
            .is_some_and(VariableAnalysis::is_written_when_assigned)
    }

    pub fn argument_can_be_xz_in_override(&self, function: FunctionId, index: usize) -> bool {
        self.function(function)
            .is_some_and(|analysis| analysis.argument_can_be_xz_in_override(index))
    }

    pub fn return_can_be_xz_in_override(&self, function: FunctionId) -> bool {
        self.function(function)
            .is_some_and(FunctionAnalysis::return_can_be_xz_in_override)
    }

    pub fn needs_default_constructor(&self, class: ClassId) -> bool {
        self.class(class)
            .is_some_and(ClassAnalysis::needs_default_constructor)
    }

    pub fn transform_super_constructor_call(&self, class: ClassId) -> bool {
        self.class(class)
            .is_some_and(ClassAnalysis::transform_super_constructor_call)
    }
}
