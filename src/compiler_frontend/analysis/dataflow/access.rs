//! Side effects of touching a variable.
//!
//! Every read and write, whatever expression it comes from, funnels through here so
//! the DA/DU check, the X/Z graph, fork capture and visibility narrowing stay in step.

use crate::compiler_frontend::analysis::dataflow::DataflowAnalyzer;
use crate::compiler_frontend::analysis::dataflow::block_analysis::AccessMode;
use crate::compiler_frontend::analysis::dataflow::expr_analysis::{ExprAnalysis, XzValue};
use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::analysis::dataflow::types::{XzSource, XzState};
use crate::compiler_frontend::schema::schema_nodes::{VarId, VarScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WriteKind {
    Full,

    /// Element or slice store. The variable as a whole doesn't become assigned.
    Partial,

    /// The declaration's own initializer.
    Initializer,
}

impl DataflowAnalyzer<'_> {
    /// `own_instance` is set for fields reached through `this`, explicitly or not.
    pub(super) fn read_var(&mut self, var: VarId, own_instance: bool, analysis: &mut ExprAnalysis) {
        self.note_access(var, AccessMode::READ);
        self.note_reference(var, own_instance, analysis);
        self.narrow_visibility(var);

        let uninitialized = self
            .tracked_slot(var, own_instance, &analysis.flow)
            .is_some_and(|slot| !analysis.flow.is_slot_da(slot));

        let record = self.table.ensure_variable(self.schema, var);
        record.read = true;

        if uninitialized {
            record.read_when_unassigned = true;
            if record.xz.is_unknown() {
                self.table
                    .mark_assigned_xz(var, XzSource::UninitializedRead, None);
            }
        }

        analysis.xz.union(self.xz_value_of(var));
    }

    pub(super) fn write_var(
        &mut self,
        var: VarId,
        kind: WriteKind,
        own_instance: bool,
        value: &XzValue,
        analysis: &mut ExprAnalysis,
    ) {
        self.note_access(var, AccessMode::WRITE);
        self.note_reference(var, own_instance, analysis);
        self.narrow_visibility(var);

        let decl = self.schema.variable(var);
        let slot = self.tracked_slot(var, own_instance, &analysis.flow);
        // The written value also flows into an enclosing expression
        let value_used = kind != WriteKind::Initializer
            && self.expr_depth > 0
            && self.discarded_depth != Some(self.expr_depth);
        let constructor_write = self.context.in_constructor
            && own_instance
            && self.context.class.is_some()
            && self.context.class == decl.declaring_class();

        let record = self.table.ensure_variable(self.schema, var);
        record.written = true;
        if value_used {
            record.written_as_side_effect = true;
        }

        if kind != WriteKind::Initializer {
            if decl.is_field() {
                if !constructor_write {
                    record.written_outside_constructor = true;
                }
            } else {
                record.reassigned = true;
            }
        }

        if let Some(slot) = slot {
            if kind != WriteKind::Partial {
                if !analysis.flow.is_du(var) {
                    record.written_when_assigned = true;
                }
                analysis.flow.mark_slot_assigned(slot);
            }
        }

        analysis.has_side_effects = true;
        self.table.assign_xz(var, value);
    }

    /// Stores into the implicit return variable of the current function.
    pub(super) fn write_return_value(&mut self, value: &XzValue) {
        let Some(function) = self.context.function else {
            return;
        };
        let Some(return_var) = self.schema.function(function).return_var else {
            return;
        };

        self.table.ensure_variable(self.schema, return_var).written = true;
        self.table.assign_xz(return_var, value);
    }

    /// What reading `var` contributes to an expression's X/Z.
    pub(super) fn xz_value_of(&mut self, var: VarId) -> XzValue {
        match self.table.ensure_variable(self.schema, var).xz {
            XzState::AssignedXz { .. } => XzValue::definite(XzSource::Assignment, Some(var)),
            XzState::Unknown => XzValue::depends_on(var),
            XzState::NotAssignedXz => XzValue::none(),
        }
    }

    /// A reference to an instance field without an object is a reference through `this`.
    pub(super) fn is_implicit_instance(&self, var: VarId) -> bool {
        self.schema.variable(var).is_instance_field()
    }

    /// Slot the current facts track `var` under. Fields of other objects share the
    /// declaration but not the storage, so they are never tracked.
    fn tracked_slot(&self, var: VarId, own_instance: bool, flow: &FlowFacts) -> Option<usize> {
        let decl = self.schema.variable(var);
        if decl.is_instance_field() && !own_instance {
            return None;
        }
        flow.slot_of(var)
    }

    fn note_reference(&self, var: VarId, own_instance: bool, analysis: &mut ExprAnalysis) {
        let decl = self.schema.variable(var);
        match decl.scope {
            VarScope::Field(_) => {
                if decl.is_instance_field() && own_instance {
                    analysis.references_instance = true;
                }
            }
            VarScope::Local(_) => analysis.references_non_argument_local = true,
            VarScope::Param { .. } => {
                if decl.modifiers.by_ref {
                    analysis.uses_by_ref_argument = true;
                }
            }
            VarScope::Global(_) | VarScope::ReturnValue(_) => {}
        }
    }

    /// Records the access in every enclosing fork branch.
    fn note_access(&mut self, var: VarId, mode: AccessMode) {
        if self.fork_scopes.is_empty() {
            return;
        }

        let decl = self.schema.variable(var);
        let captured = decl.is_local() || decl.is_param();
        for scope in &mut self.fork_scopes {
            if scope.is_declared(var) {
                continue;
            }
            scope.record(var, mode);
            if captured {
                scope.set_needs_context();
            }
        }
    }

    fn narrow_visibility(&mut self, var: VarId) {
        let Some(declaring_class) = self.schema.variable(var).declaring_class() else {
            return;
        };

        let accessing_class = self.context.class;
        let outside_class = accessing_class != Some(declaring_class);
        let outside_subclass = accessing_class
            .is_none_or(|class| !self.schema.is_subclass_of(class, declaring_class));
        let outside_directory = self.context.unit.is_some_and(|unit| {
            self.schema.unit(unit).directory != self.schema.class_directory(declaring_class)
        });

        let record = self.table.ensure_variable(self.schema, var);
        record.accessed_outside_class |= outside_class;
        record.accessed_outside_subclass |= outside_subclass;
        record.accessed_outside_directory |= outside_directory;
    }
}
