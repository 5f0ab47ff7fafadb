use crate::compiler_frontend::analysis::dataflow::DataflowAnalyzer;
use crate::compiler_frontend::analysis::dataflow::access::WriteKind;
use crate::compiler_frontend::analysis::dataflow::block_analysis::BlockAnalysis;
use crate::compiler_frontend::analysis::dataflow::expr_analysis::ExprAnalysis;
use crate::compiler_frontend::analysis::dataflow::expressions::root_variable;
use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::schema::schema_nodes::{
    Block, CaseItem, Expr, FunctionId, JoinKind, RandCaseItem, Stmt, VarId, VarScope,
};
use crate::dataflow_log;
use crate::settings::EXPECTED_FORK_BRANCHES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitKind {
    Break,
    Continue,
    Return,
}

/// Facts at an early exit, held until the construct it leaves picks them up.
#[derive(Debug)]
pub(crate) struct PendingExit {
    pub kind: ExitKind,
    pub flow: FlowFacts,
}

#[derive(Debug, Clone, Copy)]
enum LoopKind<'s> {
    While { condition: &'s Expr },
    DoWhile { condition: &'s Expr },
    For { condition: Option<&'s Expr>, update: &'s [Expr] },

    // The count was already evaluated before the loop
    Repeat,
}

struct LoopPass {
    // Facts flowing back to the top of the loop, continues included
    after_body: FlowFacts,

    // Facts when the loop ends normally
    exit: FlowFacts,

    breaks: Vec<FlowFacts>,
}

impl DataflowAnalyzer<'_> {
    pub(super) fn analyze_block(&mut self, block: &Block, flow: FlowFacts) -> FlowFacts {
        let mark = flow.begin_block();
        let mut flow = flow;
        for stmt in &block.statements {
            flow = self.analyze_stmt(stmt, flow);
        }
        self.close_scope(&mut flow, mark);
        flow
    }

    /// A branch or loop body gets its own scope even when it isn't a block.
    fn analyze_nested(&mut self, stmt: &Stmt, flow: FlowFacts) -> FlowFacts {
        let mark = flow.begin_block();
        let mut flow = self.analyze_stmt(stmt, flow);
        self.close_scope(&mut flow, mark);
        flow
    }

    /// Pops the slots allocated since `mark`. Locals that go out of scope can't be
    /// referenced again, so their X/Z closure can be checked now.
    pub(super) fn close_scope(&mut self, flow: &mut FlowFacts, mark: usize) {
        for var in flow.end_block(mark) {
            if self.schema.variable(var).is_local() {
                self.table.mark_scope_complete(var);
            }
        }
    }

    pub(super) fn analyze_stmt(&mut self, stmt: &Stmt, flow: FlowFacts) -> FlowFacts {
        self.stats.statements_analyzed += 1;

        match stmt {
            Stmt::Block(block) => self.analyze_block(block, flow),

            Stmt::VarDecl(var) => self.analyze_var_decl(*var, flow),

            Stmt::Expr(expr) => self.analyze_discarded(expr, flow).flow,

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let (when_true, when_false) = self.analyze_condition(condition, flow).split();
                let mut result = self.analyze_nested(then_branch, when_true);
                let otherwise = match else_branch {
                    Some(else_branch) => self.analyze_nested(else_branch, when_false),
                    None => when_false,
                };
                result.merge(&otherwise);
                result
            }

            Stmt::While { condition, body } => {
                self.analyze_loop(LoopKind::While { condition }, body, flow)
            }

            Stmt::DoWhile { body, condition } => {
                self.analyze_loop(LoopKind::DoWhile { condition }, body, flow)
            }

            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                // Variables declared in the header live until the loop ends
                let mark = flow.begin_block();
                let mut flow = flow;
                for stmt in init {
                    flow = self.analyze_stmt(stmt, flow);
                }

                let kind = LoopKind::For {
                    condition: condition.as_ref(),
                    update,
                };
                let mut flow = self.analyze_loop(kind, body, flow);
                self.close_scope(&mut flow, mark);
                flow
            }

            Stmt::Repeat { count, body } => {
                let flow = self.analyze_expr(count, flow).flow;
                self.analyze_loop(LoopKind::Repeat, body, flow)
            }

            Stmt::Fork { branches, join } => self.analyze_fork(branches, *join, flow),

            Stmt::Case {
                subject,
                items,
                default,
            } => self.analyze_case(subject, items, default.as_deref(), flow),

            Stmt::RandCase { items } => self.analyze_rand_case(items, flow),

            Stmt::Break => self.exit(ExitKind::Break, flow),

            Stmt::Continue => self.exit(ExitKind::Continue, flow),

            Stmt::Return(value) => {
                let flow = match value {
                    Some(value) => {
                        let analysis = self.analyze_expr(value, flow);
                        self.write_return_value(&analysis.xz);
                        analysis.flow
                    }
                    None => flow,
                };
                self.exit(ExitKind::Return, flow)
            }

            Stmt::WaitVar(targets) => self.analyze_wait(targets, flow),

            Stmt::SuperNew { constructor, args } => {
                self.analyze_super_new(*constructor, args, flow)
            }

            Stmt::Empty => flow,
        }
    }

    fn analyze_var_decl(&mut self, var: VarId, flow: FlowFacts) -> FlowFacts {
        for scope in &mut self.fork_scopes {
            scope.declare(var);
        }

        let schema = self.schema;
        self.table.ensure_variable(schema, var);
        let mut flow = flow;
        flow.alloc(var);

        let Some(initializer) = &schema.variable(var).initializer else {
            return flow;
        };

        let mut analysis = self.analyze_expr(initializer, flow);
        let value = analysis.xz.clone();
        self.write_var(var, WriteKind::Initializer, false, &value, &mut analysis);
        analysis.flow
    }

    /// Records the facts for whichever construct handles this exit. Nothing after it
    /// in the same block is reachable.
    fn exit(&mut self, kind: ExitKind, mut flow: FlowFacts) -> FlowFacts {
        self.exits.push(PendingExit {
            kind,
            flow: flow.duplicate(),
        });
        flow.mark_dead();
        flow
    }

    // ------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------

    /// The first pass assumes nothing assigned inside the body has happened yet at the
    /// top of the loop. If the body assigns anything that was unassigned before the
    /// loop, the body runs again from facts where those variables may be assigned.
    fn analyze_loop(&mut self, kind: LoopKind<'_>, body: &Stmt, entry: FlowFacts) -> FlowFacts {
        let exit_mark = self.exits.len();
        let log_mark = self.log.len();
        let stats_before = self.stats.clone();
        let mut pass = self.loop_pass(kind, body, entry.duplicate());

        let mut possibly_assigned = entry.duplicate();
        possibly_assigned.clear_du(&pass.after_body);

        if possibly_assigned.contains_du() {
            // Only the second pass is reported
            self.log.truncate(log_mark);
            self.stats = stats_before;
            self.stats.loop_second_passes += 1;
            dataflow_log!(format!(
                "Second loop pass in {} for {} variable(s)",
                self.context_name(),
                possibly_assigned.du_vars().len()
            ));

            self.exits.truncate(exit_mark);
            let mut pessimistic = entry;
            pessimistic.clear_du(&possibly_assigned);
            pass = self.loop_pass(kind, body, pessimistic);
        }

        let mut exit = pass.exit;
        for taken in &pass.breaks {
            exit.merge(taken);
        }
        exit
    }

    fn loop_pass(&mut self, kind: LoopKind<'_>, body: &Stmt, entry: FlowFacts) -> LoopPass {
        let exit_mark = self.exits.len();

        match kind {
            LoopKind::While { condition } => {
                let (when_true, when_false) = self.analyze_condition(condition, entry).split();
                let body_exit = self.analyze_nested(body, when_true);
                let (after_body, breaks) = self.collect_loop_exits(exit_mark, body_exit);

                LoopPass {
                    after_body,
                    exit: when_false,
                    breaks,
                }
            }

            LoopKind::DoWhile { condition } => {
                let body_exit = self.analyze_nested(body, entry);
                let (continued, breaks) = self.collect_loop_exits(exit_mark, body_exit);
                let (when_true, when_false) = self.analyze_condition(condition, continued).split();

                LoopPass {
                    after_body: when_true,
                    exit: when_false,
                    breaks,
                }
            }

            LoopKind::For { condition, update } => {
                let (when_true, when_false) = match condition {
                    Some(condition) => self.analyze_condition(condition, entry).split(),

                    // No condition: the loop only ends through a break
                    None => {
                        let never = entry.dead_duplicate();
                        (entry, never)
                    }
                };

                let body_exit = self.analyze_nested(body, when_true);
                let (mut after_body, breaks) = self.collect_loop_exits(exit_mark, body_exit);
                for step in update {
                    after_body = self.analyze_discarded(step, after_body).flow;
                }

                LoopPass {
                    after_body,
                    exit: when_false,
                    breaks,
                }
            }

            LoopKind::Repeat => {
                let body_exit = self.analyze_nested(body, entry.duplicate());
                let (after_body, breaks) = self.collect_loop_exits(exit_mark, body_exit);

                // Zero iterations skip the body entirely
                let mut exit = entry;
                exit.merge(&after_body);

                LoopPass {
                    after_body,
                    exit,
                    breaks,
                }
            }
        }
    }

    /// Continues rejoin the body's exit, breaks are handed back for the loop exit and
    /// returns stay pending for the function.
    fn collect_loop_exits(
        &mut self,
        mark: usize,
        body_exit: FlowFacts,
    ) -> (FlowFacts, Vec<FlowFacts>) {
        let mut after_body = body_exit;
        let mut breaks = Vec::new();

        for exit in self.exits.split_off(mark) {
            match exit.kind {
                ExitKind::Continue => after_body.merge(&exit.flow),
                ExitKind::Break => breaks.push(exit.flow),
                ExitKind::Return => self.exits.push(exit),
            }
        }

        (after_body, breaks)
    }

    /// Merges every pending `break` since `mark` into `flow`.
    fn merge_breaks(&mut self, mark: usize, flow: &mut FlowFacts) {
        for exit in self.exits.split_off(mark) {
            if exit.kind == ExitKind::Break {
                flow.merge(&exit.flow);
            } else {
                self.exits.push(exit);
            }
        }
    }

    /// Merges every return pending since `mark` into `flow`.
    pub(super) fn merge_returns(&mut self, mark: usize, flow: &mut FlowFacts) {
        for exit in self.exits.split_off(mark) {
            flow.merge(&exit.flow);
        }
    }

    // ------------------------------------------------------------
    // Fork / join
    // ------------------------------------------------------------

    fn analyze_fork(&mut self, branches: &[Stmt], join: JoinKind, flow: FlowFacts) -> FlowFacts {
        self.stats.forks_analyzed += 1;

        let mut results = Vec::with_capacity(branches.len().max(EXPECTED_FORK_BRANCHES));
        for (index, branch) in branches.iter().enumerate() {
            let scope = BlockAnalysis::new(flow.duplicate());
            let entry = scope.entry_facts();
            self.fork_scopes.push(scope);

            let branch_exit = self.analyze_nested(branch, entry);

            if let Some(scope) = self.fork_scopes.pop() {
                self.report_fork_branch(index, &scope);
            }
            results.push(branch_exit);
        }

        match join {
            JoinKind::All => join_flows(results, flow),
            JoinKind::Any => {
                let pre_fork = flow.duplicate();
                results.push(pre_fork);
                join_flows(results, flow)
            }
            JoinKind::None => flow,
        }
    }

    fn report_fork_branch(&mut self, index: usize, scope: &BlockAnalysis) {
        let accesses = scope.external_accesses();
        if accesses.is_empty() {
            return;
        }

        self.log.section(format!(
            "Fork branch {} in {} references:",
            index,
            self.context_name()
        ));

        for (var, mode) in accesses {
            let record = self.table.ensure_variable(self.schema, var);
            record.fork_read |= mode.reads();
            record.fork_write |= mode.writes();

            let how = match (mode.reads(), mode.writes()) {
                (true, true) => "read/write",
                (false, true) => "write",
                _ => "read",
            };
            self.log.line(format!("{} ({})", self.var_name(var), how));
        }

        if scope.needs_context() {
            self.log.line("captures locals or arguments: needs an execution context");
        }

        self.log.end_section();
    }

    // ------------------------------------------------------------
    // Case / randcase
    // ------------------------------------------------------------

    fn analyze_case(
        &mut self,
        subject: &Expr,
        items: &[CaseItem],
        default: Option<&Stmt>,
        flow: FlowFacts,
    ) -> FlowFacts {
        let exit_mark = self.exits.len();
        let mut selectors = self.analyze_expr(subject, flow).flow;
        let before_items = selectors.duplicate();

        let mut results = Vec::with_capacity(items.len() + 1);
        for item in items {
            for label in &item.labels {
                selectors = self.analyze_expr(label, selectors).flow;
            }
            results.push(self.analyze_nested(&item.body, selectors.duplicate()));
        }

        match default {
            Some(default) => results.push(self.analyze_nested(default, selectors)),

            // No item might match
            None => results.push(before_items.duplicate()),
        }

        let mut joined = join_flows(results, before_items);
        self.merge_breaks(exit_mark, &mut joined);
        joined
    }

    /// A randcase may pick no item when every weight is zero.
    fn analyze_rand_case(&mut self, items: &[RandCaseItem], flow: FlowFacts) -> FlowFacts {
        let exit_mark = self.exits.len();
        let before_items = flow.duplicate();
        let mut weights = flow;

        let mut results = Vec::with_capacity(items.len() + 1);
        for item in items {
            weights = self.analyze_expr(&item.weight, weights).flow;
            results.push(self.analyze_nested(&item.body, weights.duplicate()));
        }
        results.push(before_items.duplicate());

        let mut joined = join_flows(results, before_items);
        self.merge_breaks(exit_mark, &mut joined);
        joined
    }

    // ------------------------------------------------------------
    // Process control
    // ------------------------------------------------------------

    fn analyze_wait(&mut self, targets: &[Expr], flow: FlowFacts) -> FlowFacts {
        let mut flow = flow;
        for target in targets {
            flow = self.analyze_expr(target, flow).flow;

            let Some(root) = root_variable(target) else {
                continue;
            };
            self.table.ensure_variable(self.schema, root).wait_target = true;

            let decl = self.schema.variable(root);
            if let VarScope::Param { function, .. } = decl.scope {
                if decl.modifiers.var_args {
                    self.table
                        .ensure_function(self.schema, function)
                        .var_args_alias_wait_target = true;
                }
            }
        }
        flow
    }

    /// Arguments to `super.new` are evaluated before the object exists. Anything that
    /// needs the instance, a caller's local or an increment means the call has to be
    /// rewritten when the constructor is generated.
    fn analyze_super_new(
        &mut self,
        constructor: Option<FunctionId>,
        args: &[Expr],
        flow: FlowFacts,
    ) -> FlowFacts {
        let analysis = match constructor {
            Some(constructor) => self.analyze_call(constructor, None, args, flow),
            None => {
                let mut analysis = ExprAnalysis::new(flow);
                for arg in args {
                    let value = self.analyze_expr(arg, analysis.take_flow());
                    analysis.continue_without_xz(value);
                }
                analysis
            }
        };

        let needs_transform = analysis.references_instance
            || analysis.references_non_argument_local
            || analysis.uses_by_ref_argument
            || analysis.has_increment;

        if needs_transform {
            if let Some(class) = self.context.class {
                self.table.class_mut(class).transform_super_constructor_call = true;
                self.log.line(format!(
                    "super.new call in {} must be transformed",
                    self.context_name()
                ));
            }
        }

        analysis.flow
    }
}

/// Merges every flow in `flows`. With nothing to merge the result is `fallback`.
fn join_flows(flows: Vec<FlowFacts>, fallback: FlowFacts) -> FlowFacts {
    let mut flows = flows.into_iter();
    let Some(mut joined) = flows.next() else {
        return fallback;
    };
    for flow in flows {
        joined.merge(&flow);
    }
    joined
}
