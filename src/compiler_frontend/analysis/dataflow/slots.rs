use crate::compiler_frontend::schema::schema_nodes::VarId;
use crate::settings::EXPECTED_VARIABLES_PER_FUNCTION;
use rustc_hash::FxHashMap;

/// Maps variables to dense slot numbers with stack discipline.
///
/// Slots are handed out in declaration order and recycled when a block scope closes,
/// so the bitsets stay as small as the deepest nesting of live variables.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    vars: Vec<VarId>,
    slot_by_var: FxHashMap<VarId, usize>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self {
            vars: Vec::with_capacity(EXPECTED_VARIABLES_PER_FUNCTION),
            slot_by_var: FxHashMap::default(),
        }
    }

    pub fn allocate(&mut self, var: VarId) -> usize {
        assert!(
            !self.slot_by_var.contains_key(&var),
            "{var} already has a live slot"
        );

        let slot = self.vars.len();
        self.vars.push(var);
        self.slot_by_var.insert(var, slot);
        slot
    }

    pub fn next_index(&self) -> usize {
        self.vars.len()
    }

    /// Pops every slot at or above `index`.
    pub fn revert_to(&mut self, index: usize) {
        assert!(
            index <= self.vars.len(),
            "can't revert slots to {index}, only {} are allocated",
            self.vars.len()
        );

        for var in self.vars.drain(index..) {
            self.slot_by_var.remove(&var);
        }
    }

    pub fn slot_of(&self, var: VarId) -> Option<usize> {
        self.slot_by_var.get(&var).copied()
    }

    pub fn var_at(&self, slot: usize) -> VarId {
        self.vars[slot]
    }

    /// Variables holding slots in `from..`.
    pub fn vars_from(&self, from: usize) -> &[VarId] {
        &self.vars[from.min(self.vars.len())..]
    }
}
