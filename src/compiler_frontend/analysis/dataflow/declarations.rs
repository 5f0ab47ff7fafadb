//! Declaration order for one compilation unit.
//!
//! Globals come first, then classes (each after its base class), then free functions.
//! Inside a class the field initializers set up the slot baseline every constructor
//! starts from. Methods start from a baseline where every field is assigned unless some
//! constructor could leave it unassigned.

use crate::compiler_frontend::analysis::dataflow::access::WriteKind;
use crate::compiler_frontend::analysis::dataflow::flow_facts::FlowFacts;
use crate::compiler_frontend::analysis::dataflow::{DataflowAnalyzer, FunctionContext};
use crate::compiler_frontend::schema::schema_nodes::{ClassId, FunctionId, Stmt, UnitId, VarId};
use crate::dataflow_log;

impl DataflowAnalyzer<'_> {
    pub(super) fn analyze_unit(&mut self, unit: UnitId) {
        let schema = self.schema;
        let decl = schema.unit(unit);
        self.stats.units_analyzed += 1;
        dataflow_log!(format!("[Dataflow] Unit {}", decl.path));

        let saved = self.context;
        self.context = FunctionContext {
            unit: Some(unit),
            ..FunctionContext::default()
        };

        for global in &decl.globals {
            self.analyze_initialized_variable(*global, false);
        }

        for class in &decl.classes {
            self.analyze_class(*class);
        }

        for function in &decl.functions {
            let already_done = self
                .table
                .function(*function)
                .is_some_and(|record| record.is_analyzed());
            if schema.function(*function).class.is_none() && !already_done {
                self.analyze_function(*function, FlowFacts::new());
            }
        }

        self.context = saved;
    }

    /// Globals and static fields. They have no slot, so only the X/Z of the
    /// initializer and the usage facts are recorded.
    fn analyze_initialized_variable(&mut self, var: VarId, own_instance: bool) {
        let schema = self.schema;
        self.table.ensure_variable(schema, var);

        let Some(initializer) = &schema.variable(var).initializer else {
            return;
        };

        let mut analysis = self.analyze_expr(initializer, FlowFacts::new());
        let value = analysis.xz.clone();
        self.write_var(var, WriteKind::Initializer, own_instance, &value, &mut analysis);
    }

    fn analyze_class(&mut self, class: ClassId) {
        let schema = self.schema;
        if self.table.class_mut(class).analyzed {
            return;
        }
        self.table.class_mut(class).analyzed = true;

        let decl = schema.class(class);
        if let Some(base) = decl.base {
            self.analyze_class(base);
        }
        self.stats.classes_analyzed += 1;

        let saved = self.context;
        self.context = FunctionContext {
            function: None,
            class: Some(class),
            unit: Some(decl.unit),
            in_constructor: true,
        };

        // Fields of every ancestor are assigned by the time this constructor body runs
        let mut baseline = FlowFacts::new();
        self.allocate_constructed_fields(decl.base, &mut baseline);

        let own_fields = decl
            .fields()
            .filter(|field| schema.variable(*field).is_instance_field())
            .collect::<Vec<_>>();
        for field in &own_fields {
            self.table.ensure_variable(schema, *field);
            baseline.alloc(*field);
        }

        for field in decl.fields() {
            let decl = schema.variable(field);
            if decl.is_instance_field() {
                if let Some(initializer) = &decl.initializer {
                    let mut analysis = self.analyze_expr(initializer, baseline);
                    let value = analysis.xz.clone();
                    self.write_var(field, WriteKind::Initializer, true, &value, &mut analysis);
                    baseline = analysis.flow;
                }
            } else {
                self.analyze_initialized_variable(field, false);
            }
        }

        let constructors = decl.constructors().collect::<Vec<_>>();
        self.table.class_mut(class).has_default_constructor = constructors.is_empty()
            || constructors
                .iter()
                .any(|constructor| schema.function(*constructor).params.is_empty());

        for constructor in &constructors {
            let exit = self.analyze_function(*constructor, baseline.duplicate());
            self.check_constructed_fields(class, &own_fields, &exit);

            let calls_super = schema
                .function(*constructor)
                .body
                .as_ref()
                .and_then(|body| body.statements.first())
                .is_some_and(|first| matches!(first, Stmt::SuperNew { .. }));
            if let Some(base) = decl.base {
                if !calls_super {
                    self.table.class_mut(base).needs_default_constructor = true;
                }
            }
        }

        // The implicit constructor only runs the field initializers
        if constructors.is_empty() {
            self.check_constructed_fields(class, &own_fields, &baseline);
            if let Some(base) = decl.base {
                self.table.class_mut(base).needs_default_constructor = true;
            }
        }

        self.context.in_constructor = false;

        let mut method_baseline = FlowFacts::new();
        self.allocate_constructed_fields(Some(class), &mut method_baseline);
        for method in decl.methods() {
            self.analyze_function(method, method_baseline.duplicate());
        }

        self.context = saved;
    }

    /// Allocates the instance fields of `class` and its ancestors as they are after
    /// construction: assigned, or possibly assigned when some constructor can skip them.
    fn allocate_constructed_fields(&mut self, class: Option<ClassId>, flow: &mut FlowFacts) {
        let Some(class) = class else {
            return;
        };

        let schema = self.schema;
        let decl = schema.class(class);
        self.allocate_constructed_fields(decl.base, flow);

        for field in decl.fields() {
            if !schema.variable(field).is_instance_field() {
                continue;
            }

            let possibly_unassigned = self
                .table
                .ensure_variable(schema, field)
                .possibly_unassigned_after_construction;

            flow.alloc(field);
            if possibly_unassigned {
                flow.mark_possibly_assigned(field);
            } else {
                flow.mark_assigned(field);
            }
        }
    }

    fn check_constructed_fields(&mut self, class: ClassId, fields: &[VarId], exit: &FlowFacts) {
        for field in fields {
            if exit.is_da(*field) {
                continue;
            }

            self.table
                .ensure_variable(self.schema, *field)
                .possibly_unassigned_after_construction = true;

            let record = self.table.class_mut(class);
            if !record.possibly_unassigned_fields.contains(field) {
                record.possibly_unassigned_fields.push(*field);
            }
        }
    }

    /// Analyses one function body starting from `entry` and returns the facts at its
    /// exit, returns included. Parameters stay open for X/Z resolution until the end
    /// of the pass because callers can still pass them values.
    pub(super) fn analyze_function(&mut self, function: FunctionId, entry: FlowFacts) -> FlowFacts {
        let schema = self.schema;
        let decl = schema.function(function);
        self.table.ensure_function(schema, function).analyzed = true;
        self.stats.functions_analyzed += 1;

        for param in &decl.params {
            self.table.ensure_variable(schema, *param);
        }
        if let Some(return_var) = decl.return_var {
            self.table.ensure_variable(schema, return_var);
        }

        let Some(body) = &decl.body else {
            return entry;
        };

        let saved = self.context;
        self.context = FunctionContext {
            function: Some(function),
            class: decl.class,
            unit: Some(decl.unit),
            in_constructor: decl.is_constructor(),
        };
        dataflow_log!(format!("[Dataflow] Function {}", self.function_name(function)));

        let exit_mark = self.exits.len();
        let mut flow = entry;
        let mark = flow.begin_block();
        for param in &decl.params {
            flow.alloc(*param);
            flow.mark_assigned(*param);
        }

        flow = self.analyze_block(body, flow);
        self.merge_returns(exit_mark, &mut flow);
        flow.end_block(mark);

        self.context = saved;
        flow
    }
}
