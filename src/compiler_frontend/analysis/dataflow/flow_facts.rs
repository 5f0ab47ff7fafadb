use crate::compiler_frontend::analysis::dataflow::bit_state::FlowBits;
use crate::compiler_frontend::analysis::dataflow::slots::SlotAllocator;
use crate::compiler_frontend::schema::schema_nodes::VarId;
use std::cell::RefCell;
use std::rc::Rc;

/// Variable-keyed DA/DU facts at one program point.
///
/// Duplicates copy the bits but share the allocator: slot numbers are handed out in
/// source order no matter which branch is being analysed.
#[derive(Debug, Clone)]
pub struct FlowFacts {
    bits: FlowBits,
    slots: Rc<RefCell<SlotAllocator>>,

    // Unreachable point. Variables declared here start out assigned as well.
    dead: bool,
}

impl FlowFacts {
    pub fn new() -> Self {
        Self::with_allocator(Rc::new(RefCell::new(SlotAllocator::new())))
    }

    pub fn with_allocator(slots: Rc<RefCell<SlotAllocator>>) -> Self {
        Self {
            bits: FlowBits::new(),
            slots,
            dead: false,
        }
    }

    pub fn alloc(&mut self, var: VarId) -> usize {
        let slot = self.slots.borrow_mut().allocate(var);
        if self.dead {
            self.bits.mark_dead(slot + 1);
        } else {
            self.bits.init(slot);
        }
        slot
    }

    pub fn mark_assigned(&mut self, var: VarId) {
        let slot = self.expect_slot(var);
        self.bits.mark(slot);
    }

    pub fn mark_slot_assigned(&mut self, slot: usize) {
        self.bits.mark(slot);
    }

    pub fn is_da(&self, var: VarId) -> bool {
        self.bits.is_da(self.expect_slot(var))
    }

    pub fn is_du(&self, var: VarId) -> bool {
        self.bits.is_du(self.expect_slot(var))
    }

    pub fn is_slot_da(&self, slot: usize) -> bool {
        self.bits.is_da(slot)
    }

    pub fn slot_of(&self, var: VarId) -> Option<usize> {
        self.slots.borrow().slot_of(var)
    }

    pub fn has_slot(&self, var: VarId) -> bool {
        self.slot_of(var).is_some()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Everything allocated so far becomes both DA and DU.
    pub fn mark_dead(&mut self) {
        let slot_count = self.slots.borrow().next_index();
        self.bits.mark_dead(slot_count);
        self.dead = true;
    }

    pub fn duplicate(&self) -> Self {
        Self {
            bits: self.bits.clone(),
            slots: Rc::clone(&self.slots),
            dead: self.dead,
        }
    }

    /// A duplicate already marked dead, for the branch a constant condition never takes.
    pub fn dead_duplicate(&self) -> Self {
        let mut dead = self.duplicate();
        dead.mark_dead();
        dead
    }

    pub fn merge(&mut self, other: &Self) {
        debug_assert!(Rc::ptr_eq(&self.slots, &other.slots));
        self.bits.merge(&other.bits);
        self.dead = self.dead && other.dead;
    }

    pub fn begin_block(&self) -> usize {
        self.slots.borrow().next_index()
    }

    /// Pops the slots allocated since `mark` and returns the variables that left scope.
    pub fn end_block(&mut self, mark: usize) -> Vec<VarId> {
        let mut slots = self.slots.borrow_mut();
        let popped = slots.vars_from(mark).to_vec();
        slots.revert_to(mark);
        self.bits.clear_from(mark);
        popped
    }

    pub fn clear_du(&mut self, other: &Self) {
        self.bits.clear_du(&other.bits);
    }

    /// Any live slot still DU.
    pub fn contains_du(&self) -> bool {
        let live = self.next_index();
        self.bits.du_slots().any(|slot| slot < live)
    }

    /// Neither DA nor DU, as if one incoming path assigned the variable and another didn't.
    pub fn mark_possibly_assigned(&mut self, var: VarId) {
        let mut assigned = self.duplicate();
        assigned.mark_assigned(var);
        self.merge(&assigned);
    }

    /// Variables whose DU bit is set.
    pub fn du_vars(&self) -> Vec<VarId> {
        let slots = self.slots.borrow();
        let live = slots.next_index();
        self.bits
            .du_slots()
            .filter(|slot| *slot < live)
            .map(|slot| slots.var_at(slot))
            .collect()
    }

    pub fn next_index(&self) -> usize {
        self.slots.borrow().next_index()
    }

    pub fn bits(&self) -> &FlowBits {
        &self.bits
    }

    fn expect_slot(&self, var: VarId) -> usize {
        match self.slot_of(var) {
            Some(slot) => slot,
            None => panic!("{var} was never allocated a flow slot"),
        }
    }
}

impl Default for FlowFacts {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FlowFacts {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits && self.dead == other.dead
    }
}
