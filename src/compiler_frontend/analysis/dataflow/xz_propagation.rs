//! X/Z propagation graph over variable records.
//!
//! An edge `a.propagates_from = {b}` means a becomes X/Z capable if b does. Nodes only
//! carry edges while they are `Unknown`. Resolving a node in either direction removes
//! every edge it had, and the dependents are taken out of the node before anything
//! recursive happens so a cycle can't revisit a list that is being consumed.

use crate::compiler_frontend::analysis::dataflow::expr_analysis::XzValue;
use crate::compiler_frontend::analysis::dataflow::records::AnalysisTable;
use crate::compiler_frontend::analysis::dataflow::types::{XzSource, XzState};
use crate::compiler_frontend::schema::schema_nodes::VarId;
use rustc_hash::FxHashSet;

impl AnalysisTable {
    /// Resolves `var` and everything that transitively depends on it.
    pub(crate) fn mark_assigned_xz(
        &mut self,
        var: VarId,
        source: XzSource,
        origin: Option<VarId>,
    ) {
        assert!(
            self.variable_mut(var).xz.is_unknown(),
            "{var} already has a resolved X/Z state"
        );

        let mut pending = vec![(var, source, origin)];
        while let Some((var, source, origin)) = pending.pop() {
            // Reached twice through a diamond
            if !self.variable_mut(var).xz.is_unknown() {
                continue;
            }

            let (from, to) = {
                let record = self.variable_mut(var);
                record.xz = XzState::AssignedXz { source, origin };
                (
                    std::mem::take(&mut record.propagates_from),
                    std::mem::take(&mut record.propagates_to),
                )
            };

            for upstream in from {
                self.variable_mut(upstream).propagates_to.remove(&var);
            }

            if let Some(origin) = origin {
                let origin_record = self.variable_mut(origin);
                if !origin_record.dests.contains(&var) {
                    origin_record.dests.push(var);
                }
            }

            let mut dependents = to.into_iter().collect::<Vec<_>>();
            dependents.sort_unstable_by(|a, b| b.cmp(a));
            for dependent in dependents {
                self.variable_mut(dependent).propagates_from.remove(&var);
                pending.push((dependent, XzSource::Assignment, Some(var)));
            }
        }
    }

    pub(crate) fn mark_not_assigned_xz(&mut self, var: VarId) {
        assert!(
            self.variable_mut(var).xz.is_unknown(),
            "{var} already has a resolved X/Z state"
        );

        let mut recheck = self.resolve_not_assigned(var);
        while let Some(next) = recheck.pop() {
            if self.closure_is_complete(next) {
                recheck.extend(self.resolve_not_assigned(next));
            }
        }
    }

    /// Adds the edge `to <- from`, or resolves `to` immediately when `from` already is.
    pub(crate) fn track_xz_propagation(&mut self, to: VarId, from: VarId) {
        if to == from || !self.variable_mut(to).xz.is_unknown() {
            return;
        }

        match self.variable_mut(from).xz {
            XzState::AssignedXz { .. } => {
                self.mark_assigned_xz(to, XzSource::Assignment, Some(from));
            }
            XzState::NotAssignedXz => {}
            XzState::Unknown => {
                self.variable_mut(to).propagates_from.insert(from);
                self.variable_mut(from).propagates_to.insert(to);
            }
        }
    }

    /// Stores a value into `target`. Targets that are already resolved keep their state.
    pub(crate) fn assign_xz(&mut self, target: VarId, value: &XzValue) {
        if !self.variable_mut(target).xz.is_unknown() {
            return;
        }

        if let Some((source, origin)) = value.definite {
            self.mark_assigned_xz(target, source, origin);
            return;
        }

        for dependency in &value.depends_on {
            self.track_xz_propagation(target, *dependency);
            if !self.variable_mut(target).xz.is_unknown() {
                return;
            }
        }
    }

    /// No further references to `var` can occur.
    pub(crate) fn mark_scope_complete(&mut self, var: VarId) {
        self.variable_mut(var).scope_complete = true;
        self.check_closure(var);
    }

    /// Resolves `var` to not X/Z when nothing it depends on can still change.
    pub(crate) fn check_closure(&mut self, var: VarId) -> bool {
        if self.closure_is_complete(var) {
            self.mark_not_assigned_xz(var);
            true
        } else {
            false
        }
    }

    /// Walks the origin links from a resolved variable back to the root cause.
    pub fn xz_chain(&self, var: VarId) -> Vec<(VarId, XzSource)> {
        let mut chain = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(var);

        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            let Some(XzState::AssignedXz { source, origin }) =
                self.variable(id).map(|record| record.xz)
            else {
                break;
            };
            chain.push((id, source));
            current = origin;
        }

        chain
    }

    fn resolve_not_assigned(&mut self, var: VarId) -> Vec<VarId> {
        let (from, to) = {
            let record = self.variable_mut(var);
            record.xz = XzState::NotAssignedXz;
            (
                std::mem::take(&mut record.propagates_from),
                std::mem::take(&mut record.propagates_to),
            )
        };

        for upstream in from {
            self.variable_mut(upstream).propagates_to.remove(&var);
        }

        let mut dependents = to.into_iter().collect::<Vec<_>>();
        dependents.sort_unstable_by(|a, b| b.cmp(a));
        for dependent in &dependents {
            self.variable_mut(*dependent).propagates_from.remove(&var);
        }

        dependents
    }

    // The visited set is the re-entrancy guard that lets cycles terminate.
    fn closure_is_complete(&self, var: VarId) -> bool {
        let Some(record) = self.variable(var) else {
            return false;
        };
        if !record.xz.is_unknown() || !record.scope_complete {
            return false;
        }

        let mut visited = FxHashSet::default();
        let mut stack = vec![var];
        while let Some(next) = stack.pop() {
            if !visited.insert(next) {
                continue;
            }
            let Some(node) = self.variable(next) else {
                return false;
            };
            if !node.scope_complete {
                return false;
            }
            stack.extend(node.propagates_from.iter().copied());
        }

        true
    }
}
