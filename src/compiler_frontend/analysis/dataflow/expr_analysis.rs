use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::analysis::dataflow::types::XzSource;
use crate::compiler_frontend::schema::schema_nodes::VarId;

/// What an expression's value can contribute to the X/Z classification of whatever
/// it is stored into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XzValue {
    /// The value is known to be X/Z capable.
    pub definite: Option<(XzSource, Option<VarId>)>,

    /// Unresolved variables the value was computed from.
    pub depends_on: Vec<VarId>,
}

impl XzValue {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn literal() -> Self {
        Self {
            definite: Some((XzSource::XzLiteral, None)),
            depends_on: Vec::new(),
        }
    }

    pub fn definite(source: XzSource, origin: Option<VarId>) -> Self {
        Self {
            definite: Some((source, origin)),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(var: VarId) -> Self {
        Self {
            definite: None,
            depends_on: vec![var],
        }
    }

    pub fn is_none(&self) -> bool {
        self.definite.is_none() && self.depends_on.is_empty()
    }

    /// The first definite source wins; dependencies accumulate.
    pub fn union(&mut self, other: XzValue) {
        if self.definite.is_none() {
            self.definite = other.definite;
        }
        for var in other.depends_on {
            if !self.depends_on.contains(&var) {
                self.depends_on.push(var);
            }
        }
    }
}

/// Result of analysing one expression.
///
/// `flow` holds the facts after the expression. When it was analysed as a condition,
/// `when_true` and `when_false` hold the facts for each outcome as well.
#[derive(Debug, Clone)]
pub struct ExprAnalysis {
    pub flow: FlowFacts,
    pub when_true: Option<FlowFacts>,
    pub when_false: Option<FlowFacts>,

    pub has_side_effects: bool,
    pub has_increment: bool,
    pub uses_by_ref_argument: bool,
    pub references_instance: bool,
    pub references_non_argument_local: bool,

    pub xz: XzValue,
}

impl ExprAnalysis {
    pub fn new(flow: FlowFacts) -> Self {
        Self {
            flow,
            when_true: None,
            when_false: None,
            has_side_effects: false,
            has_increment: false,
            uses_by_ref_argument: false,
            references_instance: false,
            references_non_argument_local: false,
            xz: XzValue::none(),
        }
    }

    pub fn from_condition(when_true: FlowFacts, when_false: FlowFacts) -> Self {
        let mut flow = when_true.duplicate();
        flow.merge(&when_false);

        let mut analysis = Self::new(flow);
        analysis.when_true = Some(when_true);
        analysis.when_false = Some(when_false);
        analysis
    }

    /// Facts for each outcome. A plain value splits into two copies of the same facts.
    pub fn split(self) -> (FlowFacts, FlowFacts) {
        match (self.when_true, self.when_false) {
            (Some(when_true), Some(when_false)) => (when_true, when_false),
            _ => (self.flow.duplicate(), self.flow),
        }
    }

    /// Takes both outcomes out, leaving the analysis without a split until
    /// `set_outcomes` is called.
    pub fn take_outcomes(&mut self) -> (FlowFacts, FlowFacts) {
        match (self.when_true.take(), self.when_false.take()) {
            (Some(when_true), Some(when_false)) => (when_true, when_false),
            _ => (self.flow.duplicate(), self.flow.duplicate()),
        }
    }

    pub fn set_outcomes(&mut self, when_true: FlowFacts, when_false: FlowFacts) {
        let mut flow = when_true.duplicate();
        flow.merge(&when_false);
        self.flow = flow;
        self.when_true = Some(when_true);
        self.when_false = Some(when_false);
    }

    /// Moves on to the next operand, keeping flags and X/Z from this one.
    pub fn continue_with(&mut self, child: ExprAnalysis) {
        self.absorb_flags(&child);
        self.xz.union(child.xz);
        self.flow = child.flow;
        self.when_true = None;
        self.when_false = None;
    }

    /// Like `continue_with` but the child's X/Z doesn't reach this value.
    pub fn continue_without_xz(&mut self, child: ExprAnalysis) {
        self.absorb_flags(&child);
        self.flow = child.flow;
        self.when_true = None;
        self.when_false = None;
    }

    pub fn absorb_flags(&mut self, child: &ExprAnalysis) {
        self.has_side_effects |= child.has_side_effects;
        self.has_increment |= child.has_increment;
        self.uses_by_ref_argument |= child.uses_by_ref_argument;
        self.references_instance |= child.references_instance;
        self.references_non_argument_local |= child.references_non_argument_local;
    }

    /// Hands the facts to the next operand. The analysis keeps a placeholder until
    /// `continue_with` puts the operand's facts back.
    pub fn take_flow(&mut self) -> FlowFacts {
        let placeholder = self.flow.duplicate();
        std::mem::replace(&mut self.flow, placeholder)
    }
}
