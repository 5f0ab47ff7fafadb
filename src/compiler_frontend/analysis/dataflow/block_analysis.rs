use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::schema::schema_nodes::VarId;
use rustc_hash::{FxHashMap, FxHashSet};

/// How a nested scope touched a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessMode(u8);

impl AccessMode {
    pub const NONE: Self = Self(0b00);
    pub const READ: Self = Self(0b01);
    pub const WRITE: Self = Self(0b10);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn reads(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn writes(self) -> bool {
        self.contains(Self::WRITE)
    }
}

/// Scope record for one forked thread.
///
/// Starts from the pre-fork facts and collects every variable the thread touches.
/// Variables the thread declares itself are not reported.
#[derive(Debug, Clone)]
pub struct BlockAnalysis {
    entry: FlowFacts,
    accesses: FxHashMap<VarId, AccessMode>,
    declared: FxHashSet<VarId>,
    needs_context: bool,
}

impl BlockAnalysis {
    pub fn new(entry: FlowFacts) -> Self {
        Self {
            entry,
            accesses: FxHashMap::default(),
            declared: FxHashSet::default(),
            needs_context: false,
        }
    }

    /// A private copy of the facts the scope starts from.
    pub fn entry_facts(&self) -> FlowFacts {
        self.entry.duplicate()
    }

    pub fn declare(&mut self, var: VarId) {
        self.declared.insert(var);
    }

    pub fn is_declared(&self, var: VarId) -> bool {
        self.declared.contains(&var)
    }

    pub fn record(&mut self, var: VarId, mode: AccessMode) {
        if self.declared.contains(&var) {
            return;
        }

        let entry = self.accesses.entry(var).or_insert(AccessMode::NONE);
        *entry = entry.union(mode);
    }

    pub fn set_needs_context(&mut self) {
        self.needs_context = true;
    }

    /// The thread captures locals or arguments of the enclosing function and needs an
    /// execution context object to reach them.
    pub fn needs_context(&self) -> bool {
        self.needs_context
    }

    /// Accesses to variables declared outside the scope, ordered by id.
    pub fn external_accesses(&self) -> Vec<(VarId, AccessMode)> {
        let mut accesses = self
            .accesses
            .iter()
            .filter(|(var, _)| !self.declared.contains(var))
            .map(|(var, mode)| (*var, *mode))
            .collect::<Vec<_>>();
        accesses.sort_by_key(|(var, _)| *var);
        accesses
    }
}
