//! Work that needs the whole schema to have been visited: closing the X/Z graph,
//! override trees, wait aliases and stateful strings.

use crate::compiler_frontend::analysis::dataflow::DataflowAnalyzer;
use crate::compiler_frontend::schema::schema_nodes::{VarId, VarScope};
use crate::settings::FinalizationPolicy;
use rustc_hash::FxHashSet;

impl DataflowAnalyzer<'_> {
    pub(super) fn finish_pass(&mut self) {
        self.complete_declarations();
        self.finalize_xz();
        self.propagate_wait_aliases();
        self.propagate_stateful_strings();
        self.resolve_overrides();
        self.summarize();
    }

    /// Nothing references fields, globals, parameters or return values after the last
    /// unit, so every declaration left open can be closed.
    fn complete_declarations(&mut self) {
        let schema = self.schema;
        for decl in &schema.variables {
            self.table.ensure_variable(schema, decl.id);
        }

        for var in self.table.variable_ids() {
            if !self.table.variable_mut(var).scope_complete {
                self.table.mark_scope_complete(var);
            }
        }

        // Cycles only close once every member is complete
        for var in self.table.variable_ids() {
            if self.table.variable_mut(var).xz.is_unknown() {
                self.table.check_closure(var);
            }
        }
    }

    fn finalize_xz(&mut self) {
        let unresolved = self
            .table
            .variable_ids()
            .into_iter()
            .filter(|var| self.table.variable(*var).is_some_and(|r| r.xz.is_unknown()))
            .collect::<Vec<_>>();

        if unresolved.is_empty() {
            return;
        }

        match self.config.finalization {
            FinalizationPolicy::Strict => {
                let names = unresolved
                    .iter()
                    .map(|var| self.var_name(*var))
                    .collect::<Vec<_>>();
                panic!("X/Z state never resolved for: {}", names.join(", "));
            }

            FinalizationPolicy::DefaultNotXz => {
                if self.config.report_unresolved {
                    self.log.section("Resolved to not X/Z by default:");
                }

                for var in unresolved {
                    // An earlier default can resolve the rest of a cycle
                    if !self.table.variable_mut(var).xz.is_unknown() {
                        continue;
                    }
                    self.table.mark_not_assigned_xz(var);
                    self.stats.xz_defaulted += 1;

                    if self.config.report_unresolved {
                        self.log.line(self.var_name(var));
                    }
                }

                if self.config.report_unresolved {
                    self.log.end_section();
                }
            }
        }
    }

    /// A by-reference parameter used as a wait target makes every variable passed
    /// for it a wait target too, through any number of by-reference hops.
    fn propagate_wait_aliases(&mut self) {
        let schema = self.schema;
        let mut pending = self
            .table
            .variable_ids()
            .into_iter()
            .filter(|var| {
                let decl = schema.variable(*var);
                decl.is_param()
                    && decl.modifiers.by_ref
                    && self.table.variable(*var).is_some_and(|r| r.wait_target)
            })
            .collect::<Vec<_>>();

        let mut seen = pending.iter().copied().collect::<FxHashSet<_>>();
        while let Some(var) = pending.pop() {
            let mut aliases = self
                .table
                .variable_mut(var)
                .aliased_by
                .iter()
                .copied()
                .collect::<Vec<_>>();
            aliases.sort();

            for alias in aliases {
                if seen.insert(alias) {
                    self.table.variable_mut(alias).wait_alias = true;
                    pending.push(alias);
                }
            }
        }
    }

    /// Strings whose matcher state is read need the stateful representation, and so
    /// does everything that can hand them over by reference or through an override.
    fn propagate_stateful_strings(&mut self) {
        let mut pending = self
            .table
            .variable_ids()
            .into_iter()
            .filter(|var| {
                self.table
                    .variable(*var)
                    .is_some_and(|r| r.reads_matcher_state)
            })
            .collect::<Vec<_>>();

        let mut visited = FxHashSet::default();
        while let Some(var) = pending.pop() {
            if !visited.insert(var) {
                continue;
            }

            let record = self.table.variable_mut(var);
            record.needs_stateful_string = true;

            let mut neighbours = record
                .feeds_arguments
                .iter()
                .chain(record.aliased_by.iter())
                .copied()
                .collect::<Vec<_>>();
            neighbours.extend(self.override_counterparts(var));
            neighbours.sort();

            pending.extend(neighbours.into_iter().filter(|next| !visited.contains(next)));
        }
    }

    /// The same parameter in every function of the override tree `var` belongs to.
    fn override_counterparts(&self, var: VarId) -> Vec<VarId> {
        let VarScope::Param { function, index } = self.schema.variable(var).scope else {
            return Vec::new();
        };

        let mut root = function;
        while let Some(parent) = self.schema.function(root).overrides {
            root = parent;
        }

        self.override_family(root)
            .into_iter()
            .filter_map(|member| self.schema.function(member).params.get(index).copied())
            .filter(|param| *param != var)
            .collect()
    }

    fn summarize(&mut self) {
        let ids = self.table.variable_ids();
        self.stats.variables_tracked = ids.len();

        let mut assigned = Vec::new();
        for var in &ids {
            if self.table.variable_mut(*var).xz.is_assigned_xz() {
                assigned.push(*var);
                self.stats.xz_assigned += 1;
            } else {
                self.stats.xz_not_assigned += 1;
            }
        }

        let stats = self.stats.clone();
        self.log.section("Summary:");
        self.log.line(format!(
            "{} units, {} classes, {} functions",
            stats.units_analyzed, stats.classes_analyzed, stats.functions_analyzed
        ));
        self.log.line(format!(
            "{} statements, {} expressions, {} forks, {} loop second passes",
            stats.statements_analyzed,
            stats.expressions_analyzed,
            stats.forks_analyzed,
            stats.loop_second_passes
        ));
        self.log.line(format!(
            "{} variables: {} can be X/Z, {} cannot ({} by default)",
            stats.variables_tracked, stats.xz_assigned, stats.xz_not_assigned, stats.xz_defaulted
        ));
        self.log.end_section();

        if assigned.is_empty() {
            return;
        }

        self.log.section("X/Z sources:");
        for var in assigned {
            let chain = self
                .table
                .xz_chain(var)
                .into_iter()
                .map(|(link, source)| format!("{} ({})", self.var_name(link), source))
                .collect::<Vec<_>>();
            self.log.line(chain.join(" <- "));
        }
        self.log.end_section();
    }
}
