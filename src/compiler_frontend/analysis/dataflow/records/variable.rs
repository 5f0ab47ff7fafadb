use crate::compiler_frontend::analysis::dataflow::types::{VisibilityCeiling, XzSource, XzState};
use crate::compiler_frontend::schema::schema_nodes::{Schema, VarId, VarScope, VariableDecl};
use rustc_hash::FxHashSet;

/// Everything learned about one variable across the whole schema.
///
/// The X/Z edges only exist while `xz` is `Unknown`. They are maintained by the
/// propagation functions on `AnalysisTable`, never directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAnalysis {
    pub var: VarId,

    pub(crate) read: bool,
    pub(crate) written: bool,
    pub(crate) written_as_side_effect: bool,
    pub(crate) read_when_unassigned: bool,
    pub(crate) written_when_assigned: bool,

    pub(crate) xz: XzState,
    pub(crate) propagates_from: FxHashSet<VarId>,
    pub(crate) propagates_to: FxHashSet<VarId>,
    pub(crate) dests: Vec<VarId>,

    // Field visibility narrowing
    pub(crate) accessed_outside_class: bool,
    pub(crate) accessed_outside_subclass: bool,
    pub(crate) accessed_outside_directory: bool,

    // Fields: any write outside a constructor or initializer.
    pub(crate) written_outside_constructor: bool,
    pub(crate) possibly_unassigned_after_construction: bool,

    // Everything else: any write other than the declaration's initializer.
    pub(crate) reassigned: bool,

    // By-reference parameters this variable was passed to.
    pub(crate) feeds_arguments: FxHashSet<VarId>,
    // For a by-reference parameter: every variable passed to it.
    pub(crate) aliased_by: FxHashSet<VarId>,

    pub(crate) fork_read: bool,
    pub(crate) fork_write: bool,
    pub(crate) wait_target: bool,
    pub(crate) wait_alias: bool,

    pub(crate) reads_matcher_state: bool,
    pub(crate) writes_matcher_state: bool,
    pub(crate) needs_stateful_string: bool,

    pub(crate) scope_complete: bool,
}

impl VariableAnalysis {
    pub(crate) fn new(var: VarId, xz: XzState) -> Self {
        Self {
            var,
            read: false,
            written: false,
            written_as_side_effect: false,
            read_when_unassigned: false,
            written_when_assigned: false,
            xz,
            propagates_from: FxHashSet::default(),
            propagates_to: FxHashSet::default(),
            dests: Vec::new(),
            accessed_outside_class: false,
            accessed_outside_subclass: false,
            accessed_outside_directory: false,
            written_outside_constructor: false,
            possibly_unassigned_after_construction: false,
            reassigned: false,
            feeds_arguments: FxHashSet::default(),
            aliased_by: FxHashSet::default(),
            fork_read: false,
            fork_write: false,
            wait_target: false,
            wait_alias: false,
            reads_matcher_state: false,
            writes_matcher_state: false,
            needs_stateful_string: false,
            scope_complete: false,
        }
    }

    /// Record for a declaration seen for the first time.
    ///
    /// Two-valued types can never hold X/Z. Built-in parameters and return values have
    /// no body to inspect, so their annotations decide straight away.
    pub(crate) fn for_decl(decl: &VariableDecl, schema: &Schema) -> Self {
        let xz = if !decl.ty.is_four_valued() {
            XzState::NotAssignedXz
        } else {
            match decl.scope {
                VarScope::Param { function, .. } if schema.function(function).is_builtin() => {
                    if decl.declares_xz {
                        XzState::AssignedXz {
                            source: XzSource::BuiltinArgument,
                            origin: None,
                        }
                    } else {
                        XzState::NotAssignedXz
                    }
                }
                VarScope::ReturnValue(function) if schema.function(function).is_builtin() => {
                    if schema.function(function).returns_xz {
                        XzState::AssignedXz {
                            source: XzSource::BuiltinReturn,
                            origin: None,
                        }
                    } else {
                        XzState::NotAssignedXz
                    }
                }
                _ => XzState::Unknown,
            }
        };

        Self::new(decl.id, xz)
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn is_written_as_side_effect(&self) -> bool {
        self.written_as_side_effect
    }

    pub fn is_read_when_unassigned(&self) -> bool {
        self.read_when_unassigned
    }

    pub fn is_written_when_assigned(&self) -> bool {
        self.written_when_assigned
    }

    pub fn xz_state(&self) -> XzState {
        self.xz
    }

    pub fn can_be_xz(&self) -> bool {
        self.xz.is_assigned_xz()
    }

    pub fn xz_source(&self) -> Option<XzSource> {
        match self.xz {
            XzState::AssignedXz { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn xz_origin(&self) -> Option<VarId> {
        match self.xz {
            XzState::AssignedXz { origin, .. } => origin,
            _ => None,
        }
    }

    /// Variables that inherited X/Z from this one.
    pub fn xz_dests(&self) -> &[VarId] {
        &self.dests
    }

    pub fn is_fork_read(&self) -> bool {
        self.fork_read
    }

    pub fn is_fork_write(&self) -> bool {
        self.fork_write
    }

    pub fn is_wait_target(&self) -> bool {
        self.wait_target
    }

    pub fn is_wait_alias(&self) -> bool {
        self.wait_alias
    }

    pub fn reads_matcher_state(&self) -> bool {
        self.reads_matcher_state
    }

    pub fn writes_matcher_state(&self) -> bool {
        self.writes_matcher_state
    }

    pub fn needs_stateful_string_representation(&self) -> bool {
        self.needs_stateful_string
    }

    pub fn is_possibly_unassigned_after_construction(&self) -> bool {
        self.possibly_unassigned_after_construction
    }

    pub fn visibility_ceiling(&self) -> VisibilityCeiling {
        if !self.accessed_outside_class {
            VisibilityCeiling::Private
        } else if !self.accessed_outside_directory {
            VisibilityCeiling::Package
        } else if !self.accessed_outside_subclass {
            VisibilityCeiling::Protected
        } else {
            VisibilityCeiling::Public
        }
    }

    /// Only assigned where it is initialised: field initializers and the declaring
    /// class's own constructors (through `this`) for fields, the declaration for
    /// everything else.
    pub fn is_effectively_final(&self) -> bool {
        !self.written_outside_constructor && !self.reassigned
    }

    pub fn by_ref_arguments(&self) -> impl Iterator<Item = VarId> + '_ {
        self.feeds_arguments.iter().copied()
    }

    pub fn aliases(&self) -> impl Iterator<Item = VarId> + '_ {
        self.aliased_by.iter().copied()
    }

    pub fn is_scope_complete(&self) -> bool {
        self.scope_complete
    }
}
