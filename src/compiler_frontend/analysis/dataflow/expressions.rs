use crate::compiler_frontend::analysis::dataflow::DataflowAnalyzer;
use crate::compiler_frontend::analysis::dataflow::access::WriteKind;
use crate::compiler_frontend::analysis::dataflow::expr_analysis::{ExprAnalysis, XzValue};
use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::analysis::dataflow::operators::{
    AssignShape, CONCAT_TARGET_SHAPE, assign_shape, binary_shape, unary_shape,
};
use crate::compiler_frontend::schema::schema_nodes::{
    AssignOp, BinaryOp, ClassId, Expr, ExprKind, FunctionDecl, FunctionId, Literal, StringMethod,
    UnaryOp, VarId,
};

/// The variable an lvalue ultimately stores into.
pub(super) fn root_variable(expr: &Expr) -> Option<VarId> {
    match &expr.kind {
        ExprKind::Var(var) => Some(*var),
        ExprKind::Field { field, .. } => Some(*field),
        ExprKind::Index { base, .. } | ExprKind::Slice { base, .. } => root_variable(base),
        ExprKind::Cast(inner) => root_variable(inner),
        _ => None,
    }
}

/// Parameter receiving argument `index`. Extra arguments all land in a trailing var-args parameter.
pub(super) fn param_for_argument(
    function: &FunctionDecl,
    index: usize,
    is_var_args: impl Fn(VarId) -> bool,
) -> Option<VarId> {
    if let Some(param) = function.params.get(index) {
        return Some(*param);
    }
    function
        .params
        .last()
        .copied()
        .filter(|param| is_var_args(*param))
}

impl DataflowAnalyzer<'_> {
    pub(super) fn analyze_expr(&mut self, expr: &Expr, flow: FlowFacts) -> ExprAnalysis {
        self.stats.expressions_analyzed += 1;
        self.expr_depth += 1;
        let analysis = self.analyze_expr_kind(expr, flow);
        self.expr_depth -= 1;
        analysis
    }

    /// An expression evaluated only for its effects. Writes at its top level don't
    /// feed any other value.
    pub(super) fn analyze_discarded(&mut self, expr: &Expr, flow: FlowFacts) -> ExprAnalysis {
        let saved = self.discarded_depth.replace(self.expr_depth + 1);
        let analysis = self.analyze_expr(expr, flow);
        self.discarded_depth = saved;
        analysis
    }

    fn analyze_expr_kind(&mut self, expr: &Expr, flow: FlowFacts) -> ExprAnalysis {
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let mut analysis = ExprAnalysis::new(flow);
                if matches!(literal, Literal::Bit { has_xz: true, .. }) {
                    analysis.xz = XzValue::literal();
                }
                analysis
            }

            ExprKind::EnumConst { .. } => ExprAnalysis::new(flow),

            ExprKind::Var(var) => {
                let mut analysis = ExprAnalysis::new(flow);
                let own_instance = self.is_implicit_instance(*var);
                self.read_var(*var, own_instance, &mut analysis);
                analysis
            }

            ExprKind::This => {
                let mut analysis = ExprAnalysis::new(flow);
                analysis.references_instance = true;
                analysis
            }

            ExprKind::Field { object, field } => {
                let own_instance = matches!(object.kind, ExprKind::This);
                let mut analysis = self.analyze_expr(object, flow);

                // The handle's own X/Z says nothing about the field
                analysis.xz = XzValue::none();
                self.read_var(*field, own_instance, &mut analysis);
                analysis
            }

            ExprKind::Index { base, index } => {
                let mut analysis = self.analyze_expr(base, flow);
                let index = self.analyze_expr(index, analysis.take_flow());
                analysis.continue_with(index);
                analysis
            }

            ExprKind::Slice { base, high, low } => {
                let mut analysis = self.analyze_expr(base, flow);
                for bound in [high, low] {
                    let bound = self.analyze_expr(bound, analysis.take_flow());
                    analysis.continue_with(bound);
                }
                analysis
            }

            ExprKind::Unary {
                op: UnaryOp::LogicalNot,
                ..
            } => self.analyze_condition_kind(expr, flow),

            ExprKind::Unary { op, operand } => self.analyze_unary(*op, operand, flow),

            ExprKind::Binary {
                op: BinaryOp::LogicalAnd | BinaryOp::LogicalOr,
                ..
            } => self.analyze_condition_kind(expr, flow),

            ExprKind::Binary { op, left, right } => {
                let shape = binary_shape(*op);
                let mut analysis = self.analyze_expr(left, flow);
                if !shape.operand_carries_xz(0) {
                    analysis.xz = XzValue::none();
                }

                let right = self.analyze_expr(right, analysis.take_flow());
                if shape.operand_carries_xz(1) {
                    analysis.continue_with(right);
                } else {
                    analysis.continue_without_xz(right);
                }
                analysis
            }

            ExprKind::Assign { op, target, value } => {
                self.analyze_assignment(*op, target, value, flow)
            }

            ExprKind::Concat(parts) => {
                let mut analysis = ExprAnalysis::new(flow);
                for part in parts {
                    let part = self.analyze_expr(part, analysis.take_flow());
                    analysis.continue_with(part);
                }
                analysis
            }

            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                if then_value.ty.is_integral() && else_value.ty.is_integral() {
                    return self.analyze_condition_kind(expr, flow);
                }

                let condition = self.analyze_condition(condition, flow);
                let mut analysis = ExprAnalysis::new(condition.flow.duplicate());
                analysis.absorb_flags(&condition);
                analysis.xz.union(condition.xz.clone());

                let (when_true, when_false) = condition.split();
                let then_value = self.analyze_expr(then_value, when_true);
                let else_value = self.analyze_expr(else_value, when_false);

                let mut flow = then_value.flow.duplicate();
                flow.merge(&else_value.flow);
                analysis.flow = flow;

                analysis.absorb_flags(&then_value);
                analysis.absorb_flags(&else_value);
                analysis.xz.union(then_value.xz);
                analysis.xz.union(else_value.xz);
                analysis
            }

            ExprKind::Cast(inner) => self.analyze_expr(inner, flow),

            ExprKind::Call {
                function,
                receiver,
                args,
            } => self.analyze_call(*function, receiver.as_deref(), args, flow),

            ExprKind::New {
                class,
                constructor,
                args,
            } => self.analyze_new(*class, *constructor, args, flow),

            ExprKind::StringMethod {
                receiver,
                method,
                args,
            } => self.analyze_string_method(receiver, *method, args, flow),
        }
    }

    /// Condition mode: the result always carries separate when-true and when-false facts.
    pub(super) fn analyze_condition(&mut self, expr: &Expr, flow: FlowFacts) -> ExprAnalysis {
        self.stats.expressions_analyzed += 1;
        self.expr_depth += 1;
        let analysis = self.analyze_condition_kind(expr, flow);
        self.expr_depth -= 1;
        analysis
    }

    fn analyze_condition_kind(&mut self, expr: &Expr, flow: FlowFacts) -> ExprAnalysis {
        match &expr.kind {
            ExprKind::Literal(literal) if literal.constant_truth().is_some() => {
                constant_condition(literal.constant_truth() == Some(true), flow)
            }

            ExprKind::EnumConst { value, .. } => constant_condition(*value != 0, flow),

            ExprKind::Unary {
                op: UnaryOp::LogicalNot,
                operand,
            } => {
                let mut analysis = self.analyze_condition(operand, flow);
                let (when_true, when_false) = analysis.take_outcomes();
                analysis.set_outcomes(when_false, when_true);
                analysis
            }

            ExprKind::Binary {
                op: BinaryOp::LogicalAnd,
                left,
                right,
            } => {
                let mut analysis = self.analyze_condition(left, flow);
                let (left_true, mut when_false) = analysis.take_outcomes();

                // The right side only runs when the left was true
                let mut right = self.analyze_condition(right, left_true);
                analysis.absorb_flags(&right);
                analysis.xz.union(std::mem::take(&mut right.xz));

                let (when_true, right_false) = right.split();
                when_false.merge(&right_false);
                analysis.set_outcomes(when_true, when_false);
                analysis
            }

            ExprKind::Binary {
                op: BinaryOp::LogicalOr,
                left,
                right,
            } => {
                let mut analysis = self.analyze_condition(left, flow);
                let (mut when_true, left_false) = analysis.take_outcomes();

                let mut right = self.analyze_condition(right, left_false);
                analysis.absorb_flags(&right);
                analysis.xz.union(std::mem::take(&mut right.xz));

                let (right_true, when_false) = right.split();
                when_true.merge(&right_true);
                analysis.set_outcomes(when_true, when_false);
                analysis
            }

            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } if then_value.ty.is_integral() && else_value.ty.is_integral() => {
                let mut analysis = self.analyze_condition(condition, flow);
                let (condition_true, condition_false) = analysis.take_outcomes();

                let mut then_value = self.analyze_condition(then_value, condition_true);
                let mut else_value = self.analyze_condition(else_value, condition_false);
                analysis.absorb_flags(&then_value);
                analysis.absorb_flags(&else_value);
                analysis.xz.union(std::mem::take(&mut then_value.xz));
                analysis.xz.union(std::mem::take(&mut else_value.xz));

                let (mut when_true, mut when_false) = then_value.split();
                let (else_true, else_false) = else_value.split();
                when_true.merge(&else_true);
                when_false.merge(&else_false);
                analysis.set_outcomes(when_true, when_false);
                analysis
            }

            // Any other value: both outcomes see the same facts
            _ => {
                let mut analysis = self.analyze_expr_kind(expr, flow);
                let (when_true, when_false) = analysis.take_outcomes();
                analysis.set_outcomes(when_true, when_false);
                analysis
            }
        }
    }

    fn analyze_unary(&mut self, op: UnaryOp, operand: &Expr, flow: FlowFacts) -> ExprAnalysis {
        let shape = unary_shape(op);

        if shape.assign.writes_first() {
            // The new value only depends on the old one, which is the operand itself
            let mut analysis = ExprAnalysis::new(flow);
            analysis.has_increment = true;
            self.analyze_store(operand, shape.assign, &XzValue::none(), &mut analysis);
            return analysis;
        }

        let mut analysis = self.analyze_expr(operand, flow);
        if !shape.operand_carries_xz(0) {
            analysis.xz = XzValue::none();
        }
        analysis
    }

    fn analyze_assignment(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        flow: FlowFacts,
    ) -> ExprAnalysis {
        let shape = assign_shape(op);

        // The value is evaluated before the store
        let mut analysis = self.analyze_expr(value, flow);
        if !shape.operand_carries_xz(1) {
            analysis.xz = XzValue::none();
        }
        let stored = analysis.xz.clone();

        match &target.kind {
            ExprKind::Concat(parts) => {
                let part_shape = CONCAT_TARGET_SHAPE;
                if part_shape.evaluates_right_to_left() {
                    for part in parts.iter().rev() {
                        self.analyze_store(part, part_shape.assign, &stored, &mut analysis);
                    }
                } else {
                    for part in parts {
                        self.analyze_store(part, part_shape.assign, &stored, &mut analysis);
                    }
                }
            }
            _ => self.analyze_store(target, shape.assign, &stored, &mut analysis),
        }

        analysis
    }

    /// Visits an assignment target. Sub-expressions of the target (objects, indices)
    /// are read first, then the store happens.
    pub(super) fn analyze_store(
        &mut self,
        target: &Expr,
        shape: AssignShape,
        value: &XzValue,
        analysis: &mut ExprAnalysis,
    ) {
        match &target.kind {
            ExprKind::Var(var) => {
                let own_instance = self.is_implicit_instance(*var);
                if shape.reads_target() {
                    self.read_var(*var, own_instance, analysis);
                }
                self.write_var(*var, WriteKind::Full, own_instance, value, analysis);
            }

            ExprKind::Field { object, field } => {
                let own_instance = matches!(object.kind, ExprKind::This);
                let object = self.analyze_expr(object, analysis.take_flow());
                analysis.continue_without_xz(object);

                if shape.reads_target() {
                    self.read_var(*field, own_instance, analysis);
                }
                self.write_var(*field, WriteKind::Full, own_instance, value, analysis);
            }

            ExprKind::Index { base, index } => {
                let index = self.analyze_expr(index, analysis.take_flow());
                analysis.continue_without_xz(index);
                self.analyze_partial_store(base, shape, value, analysis);
            }

            ExprKind::Slice { base, high, low } => {
                for bound in [high, low] {
                    let bound = self.analyze_expr(bound, analysis.take_flow());
                    analysis.continue_without_xz(bound);
                }
                self.analyze_partial_store(base, shape, value, analysis);
            }

            ExprKind::Cast(inner) => self.analyze_store(inner, shape, value, analysis),

            _ => {
                let other = self.analyze_expr(target, analysis.take_flow());
                analysis.continue_without_xz(other);
            }
        }
    }

    fn analyze_partial_store(
        &mut self,
        base: &Expr,
        shape: AssignShape,
        value: &XzValue,
        analysis: &mut ExprAnalysis,
    ) {
        match &base.kind {
            ExprKind::Var(var) => {
                let own_instance = self.is_implicit_instance(*var);
                if shape.reads_target() {
                    self.read_var(*var, own_instance, analysis);
                }
                self.write_var(*var, WriteKind::Partial, own_instance, value, analysis);
            }

            ExprKind::Field { object, field } => {
                let own_instance = matches!(object.kind, ExprKind::This);
                let object = self.analyze_expr(object, analysis.take_flow());
                analysis.continue_without_xz(object);

                if shape.reads_target() {
                    self.read_var(*field, own_instance, analysis);
                }
                self.write_var(*field, WriteKind::Partial, own_instance, value, analysis);
            }

            // Nested element stores
            ExprKind::Index { .. } | ExprKind::Slice { .. } | ExprKind::Cast(_) => {
                self.analyze_store(base, shape, value, analysis)
            }

            _ => {
                let other = self.analyze_expr(base, analysis.take_flow());
                analysis.continue_without_xz(other);
            }
        }
    }

    pub(super) fn analyze_call(
        &mut self,
        function: FunctionId,
        receiver: Option<&Expr>,
        args: &[Expr],
        flow: FlowFacts,
    ) -> ExprAnalysis {
        let schema = self.schema;
        let decl = schema.function(function);
        self.table.ensure_function(schema, function);

        let mut analysis = match receiver {
            Some(receiver) => {
                let mut analysis = self.analyze_expr(receiver, flow);
                analysis.xz = XzValue::none();
                analysis
            }
            None => {
                let mut analysis = ExprAnalysis::new(flow);
                if decl.class.is_some() && !decl.is_static && !decl.is_constructor() {
                    analysis.references_instance = true;
                }
                analysis
            }
        };

        // Arguments reach the parameters of whichever override actually runs
        let family = self.override_family(function);

        for (index, arg) in args.iter().enumerate() {
            let Some(param) = param_for_argument(decl, index, |param| {
                schema.variable(param).modifiers.var_args
            }) else {
                let value = self.analyze_expr(arg, analysis.take_flow());
                analysis.continue_without_xz(value);
                continue;
            };

            let receiving = family
                .iter()
                .filter_map(|callee| {
                    param_for_argument(schema.function(*callee), index, |param| {
                        schema.variable(param).modifiers.var_args
                    })
                })
                .collect::<Vec<_>>();

            if schema.variable(param).modifiers.by_ref {
                self.analyze_by_ref_argument(arg, &receiving, &mut analysis);
            } else {
                let value = self.analyze_expr(arg, analysis.take_flow());
                let xz = value.xz.clone();
                analysis.continue_without_xz(value);

                for param in receiving {
                    self.table.ensure_variable(schema, param);
                    self.table.assign_xz(param, &xz);
                }
            }
        }

        analysis.has_side_effects = true;

        for callee in family {
            if let Some(return_var) = schema.function(callee).return_var {
                let returned = self.xz_value_of(return_var);
                analysis.xz.union(returned);
            }
        }

        analysis
    }

    /// The callee reads and writes the caller's variable through the reference.
    fn analyze_by_ref_argument(
        &mut self,
        arg: &Expr,
        params: &[VarId],
        analysis: &mut ExprAnalysis,
    ) {
        let mut incoming = XzValue::none();
        for param in params {
            let value = self.xz_value_of(*param);
            incoming.union(value);
        }

        // Reading the argument back is not part of the call's own value
        let call_xz = std::mem::take(&mut analysis.xz);
        self.analyze_store(arg, AssignShape::FirstReadWritten, &incoming, analysis);
        analysis.xz = call_xz;

        let Some(root) = root_variable(arg) else {
            return;
        };

        for param in params {
            self.table
                .ensure_variable(self.schema, root)
                .feeds_arguments
                .insert(*param);
            self.table
                .ensure_variable(self.schema, *param)
                .aliased_by
                .insert(root);
            self.table.track_xz_propagation(*param, root);
        }
    }

    fn analyze_new(
        &mut self,
        class: ClassId,
        constructor: Option<FunctionId>,
        args: &[Expr],
        flow: FlowFacts,
    ) -> ExprAnalysis {
        if args.is_empty() {
            self.table.class_mut(class).needs_default_constructor = true;
        }

        let mut analysis = match constructor {
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

        // An object handle is never X/Z
        analysis.xz = XzValue::none();
        analysis.has_side_effects = true;
        analysis
    }

    fn analyze_string_method(
        &mut self,
        receiver: &Expr,
        method: StringMethod,
        args: &[Expr],
        flow: FlowFacts,
    ) -> ExprAnalysis {
        let mut analysis = self.analyze_expr(receiver, flow);
        analysis.xz = XzValue::none();

        if let Some(root) = root_variable(receiver) {
            let record = self.table.ensure_variable(self.schema, root);
            if method.writes_matcher_state() {
                record.writes_matcher_state = true;
            }
            if method.reads_matcher_state() {
                record.reads_matcher_state = true;
            }
        }

        if method.writes_matcher_state() {
            analysis.has_side_effects = true;
        }

        for arg in args {
            let value = self.analyze_expr(arg, analysis.take_flow());
            analysis.continue_without_xz(value);
        }

        analysis
    }
}

/// A compile-time constant condition: one outcome is live, the other unreachable.
fn constant_condition(truth: bool, flow: FlowFacts) -> ExprAnalysis {
    let dead = flow.dead_duplicate();
    if truth {
        ExprAnalysis::from_condition(flow, dead)
    } else {
        ExprAnalysis::from_condition(dead, flow)
    }
}
