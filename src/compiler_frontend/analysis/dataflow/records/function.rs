use crate::compiler_frontend::schema::schema_nodes::FunctionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionAnalysis {
    pub function: FunctionId,

    pub(crate) overrides: Option<FunctionId>,
    pub(crate) overridden_by: Vec<FunctionId>,

    // Resolved across the whole override tree, not just this body.
    pub(crate) argument_xz_in_override: Vec<bool>,
    pub(crate) return_xz_in_override: bool,
    pub(crate) argument_stateful_in_override: Vec<bool>,

    pub(crate) non_virtual_but_overridden: bool,
    pub(crate) var_args_alias_wait_target: bool,
    pub(crate) analyzed: bool,
}

impl FunctionAnalysis {
    pub(crate) fn new(function: FunctionId, param_count: usize) -> Self {
        Self {
            function,
            overrides: None,
            overridden_by: Vec::new(),
            argument_xz_in_override: vec![false; param_count],
            return_xz_in_override: false,
            argument_stateful_in_override: vec![false; param_count],
            non_virtual_but_overridden: false,
            var_args_alias_wait_target: false,
            analyzed: false,
        }
    }

    pub fn overrides(&self) -> Option<FunctionId> {
        self.overrides
    }

    pub fn overridden_by(&self) -> &[FunctionId] {
        &self.overridden_by
    }

    pub fn argument_can_be_xz_in_override(&self, index: usize) -> bool {
        self.argument_xz_in_override
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    pub fn return_can_be_xz_in_override(&self) -> bool {
        self.return_xz_in_override
    }

    pub fn argument_is_stateful_in_override(&self, index: usize) -> bool {
        self.argument_stateful_in_override
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    pub fn is_non_virtual_but_overridden(&self) -> bool {
        self.non_virtual_but_overridden
    }

    pub fn is_var_args_alias_wait_target(&self) -> bool {
        self.var_args_alias_wait_target
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }
}
