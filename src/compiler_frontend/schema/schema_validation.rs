//! Well-formedness checks run before the dataflow pass.
//!
//! The analysis itself treats a broken schema as a programmer error and panics.
//! Schemas that come from outside the process (JSON files) are checked here first
//! so a bad input is reported as a CompilerError instead.

use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorLocation};
use crate::compiler_frontend::schema::schema_nodes::{
    ClassId, Expr, ExprKind, FunctionDecl, FunctionId, Schema, Stmt, UnitId, VarId, VarScope,
};
use crate::return_schema_error;
use crate::schema_log;

pub(crate) fn validate_schema(schema: &Schema) -> Result<(), CompilerError> {
    SchemaValidator { schema }.run()
}

struct SchemaValidator<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaValidator<'a> {
    fn run(&self) -> Result<(), CompilerError> {
        self.check_arena_ids()?;

        for unit in &self.schema.units {
            for class in &unit.classes {
                self.check_class(*class)?;
            }
            for function in &unit.functions {
                self.check_function_id(*function, "compilation unit")?;
            }
            for global in &unit.globals {
                self.check_var(*global, "compilation unit")?;
            }
        }

        for class in &self.schema.classes {
            self.check_unit(class.unit, &class.name)?;
            if let Some(base) = class.base {
                self.check_class(base)?;
            }
        }

        for variable in &self.schema.variables {
            self.check_scope(variable.scope, &variable.name)?;
            if let Some(initializer) = &variable.initializer {
                self.check_expr(initializer, &variable.name)?;
            }
        }

        for function in &self.schema.functions {
            self.check_function(function)?;
        }

        schema_log!(
            "[Schema] Validated ",
            {self.schema.classes.len()},
            " classes, ",
            {self.schema.functions.len()},
            " functions, ",
            {self.schema.variables.len()},
            " variables"
        );

        Ok(())
    }

    fn check_arena_ids(&self) -> Result<(), CompilerError> {
        for (index, unit) in self.schema.units.iter().enumerate() {
            if unit.id.0 as usize != index {
                return_schema_error!(
                    format!("Compilation unit '{}' is stored at index {index} but has id {}", unit.path, unit.id.0),
                    ErrorLocation::at_node(unit.path.clone())
                );
            }
        }

        for (index, class) in self.schema.classes.iter().enumerate() {
            if class.id.0 as usize != index {
                return_schema_error!(
                    format!("Class '{}' is stored at index {index} but has id {}", class.name, class.id.0),
                    ErrorLocation::at_node(class.name.clone()),
                    { ClassName => class.name.as_str() }
                );
            }
        }

        for (index, function) in self.schema.functions.iter().enumerate() {
            if function.id.0 as usize != index {
                return_schema_error!(
                    format!("Function '{}' is stored at index {index} but has id {}", function.name, function.id.0),
                    ErrorLocation::at_node(function.name.clone()),
                    { FunctionName => function.name.as_str() }
                );
            }
        }

        for (index, variable) in self.schema.variables.iter().enumerate() {
            if variable.id.0 as usize != index {
                return_schema_error!(
                    format!("Variable '{}' is stored at index {index} but has id {}", variable.name, variable.id.0),
                    ErrorLocation::at_node(variable.name.clone()),
                    { VariableName => variable.name.as_str() }
                );
            }
        }

        Ok(())
    }

    fn check_unit(&self, unit: UnitId, context: &str) -> Result<(), CompilerError> {
        if unit.0 as usize >= self.schema.units.len() {
            return_schema_error!(
                format!("Unknown compilation unit {} referenced", unit.0),
                ErrorLocation::at_node(context)
            );
        }
        Ok(())
    }

    fn check_class(&self, class: ClassId) -> Result<(), CompilerError> {
        if class.0 as usize >= self.schema.classes.len() {
            return_schema_error!(
                format!("Unknown class {class} referenced"),
                ErrorLocation::default()
            );
        }
        Ok(())
    }

    fn check_function_id(&self, function: FunctionId, context: &str) -> Result<(), CompilerError> {
        if function.0 as usize >= self.schema.functions.len() {
            return_schema_error!(
                format!("Unknown function {function} referenced"),
                ErrorLocation::at_node(context)
            );
        }
        Ok(())
    }

    fn check_var(&self, var: VarId, context: &str) -> Result<(), CompilerError> {
        if var.0 as usize >= self.schema.variables.len() {
            return_schema_error!(
                format!("Unknown variable {var} referenced"),
                ErrorLocation::at_node(context)
            );
        }
        Ok(())
    }

    fn check_scope(&self, scope: VarScope, context: &str) -> Result<(), CompilerError> {
        match scope {
            VarScope::Global(unit) => self.check_unit(unit, context),
            VarScope::Field(class) => self.check_class(class),
            VarScope::Param { function, .. }
            | VarScope::Local(function)
            | VarScope::ReturnValue(function) => self.check_function_id(function, context),
        }
    }

    fn check_function(&self, function: &FunctionDecl) -> Result<(), CompilerError> {
        self.check_unit(function.unit, &function.name)?;

        if let Some(class) = function.class {
            self.check_class(class)?;
        } else if function.is_constructor() {
            return_schema_error!(
                format!("Constructor '{}' doesn't belong to a class", function.name),
                ErrorLocation::at_node(function.name.clone()),
                { FunctionName => function.name.as_str() }
            );
        }

        for (index, param) in function.params.iter().enumerate() {
            self.check_var(*param, &function.name)?;
            let expected = VarScope::Param {
                function: function.id,
                index,
            };
            if self.schema.variable(*param).scope != expected {
                return_schema_error!(
                    format!(
                        "Parameter '{}' of '{}' doesn't declare itself as parameter {index}",
                        self.schema.variable(*param).name,
                        function.name
                    ),
                    ErrorLocation::at_node(function.name.clone()),
                    { FunctionName => function.name.as_str() }
                );
            }
        }

        if let Some(return_var) = function.return_var {
            self.check_var(return_var, &function.name)?;
        }

        if let Some(parent) = function.overrides {
            self.check_function_id(parent, &function.name)?;
            self.check_override_chain(function)?;
        }

        if let Some(body) = &function.body {
            for statement in &body.statements {
                self.check_stmt(statement, &function.name)?;
            }
        }

        Ok(())
    }

    /// Every override chain has to end at a root.
    fn check_override_chain(&self, function: &FunctionDecl) -> Result<(), CompilerError> {
        let mut current = function.overrides;
        let mut steps = 0;

        while let Some(parent) = current {
            if parent == function.id || steps > self.schema.functions.len() {
                return_schema_error!(
                    format!("Override chain of '{}' loops back on itself", function.name),
                    ErrorLocation::at_node(function.name.clone()),
                    { FunctionName => function.name.as_str() }
                );
            }

            self.check_function_id(parent, &function.name)?;
            current = self.schema.function(parent).overrides;
            steps += 1;
        }

        Ok(())
    }

    fn check_stmt(&self, statement: &Stmt, context: &str) -> Result<(), CompilerError> {
        match statement {
            Stmt::Block(block) => {
                for inner in &block.statements {
                    self.check_stmt(inner, context)?;
                }
            }
            Stmt::VarDecl(var) => self.check_var(*var, context)?,
            Stmt::Expr(expr) => self.check_expr(expr, context)?,
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition, context)?;
                self.check_stmt(then_branch, context)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch, context)?;
                }
            }
            Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
                self.check_expr(condition, context)?;
                self.check_stmt(body, context)?;
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                for inner in init {
                    self.check_stmt(inner, context)?;
                }
                if let Some(condition) = condition {
                    self.check_expr(condition, context)?;
                }
                for expr in update {
                    self.check_expr(expr, context)?;
                }
                self.check_stmt(body, context)?;
            }
            Stmt::Repeat { count, body } => {
                self.check_expr(count, context)?;
                self.check_stmt(body, context)?;
            }
            Stmt::Fork { branches, .. } => {
                for branch in branches {
                    self.check_stmt(branch, context)?;
                }
            }
            Stmt::Case {
                subject,
                items,
                default,
            } => {
                self.check_expr(subject, context)?;
                for item in items {
                    for label in &item.labels {
                        self.check_expr(label, context)?;
                    }
                    self.check_stmt(&item.body, context)?;
                }
                if let Some(default) = default {
                    self.check_stmt(default, context)?;
                }
            }
            Stmt::RandCase { items } => {
                for item in items {
                    self.check_expr(&item.weight, context)?;
                    self.check_stmt(&item.body, context)?;
                }
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.check_expr(value, context)?;
                }
            }
            Stmt::WaitVar(targets) => {
                for target in targets {
                    self.check_expr(target, context)?;
                }
            }
            Stmt::SuperNew { constructor, args } => {
                if let Some(constructor) = constructor {
                    self.check_function_id(*constructor, context)?;
                    self.check_arity(*constructor, args.len(), context)?;
                }
                for arg in args {
                    self.check_expr(arg, context)?;
                }
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }

        Ok(())
    }

    fn check_expr(&self, expr: &Expr, context: &str) -> Result<(), CompilerError> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::EnumConst { .. } | ExprKind::This => {}
            ExprKind::Var(var) => self.check_var(*var, context)?,
            ExprKind::Field { object, field } => {
                self.check_expr(object, context)?;
                self.check_var(*field, context)?;
            }
            ExprKind::Index { base, index } => {
                self.check_expr(base, context)?;
                self.check_expr(index, context)?;
            }
            ExprKind::Slice { base, high, low } => {
                self.check_expr(base, context)?;
                self.check_expr(high, context)?;
                self.check_expr(low, context)?;
            }
            ExprKind::Unary { operand, .. } | ExprKind::Cast(operand) => {
                self.check_expr(operand, context)?
            }
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left, context)?;
                self.check_expr(right, context)?;
            }
            ExprKind::Assign { target, value, .. } => {
                self.check_expr(target, context)?;
                self.check_expr(value, context)?;
            }
            ExprKind::Concat(parts) => {
                for part in parts {
                    self.check_expr(part, context)?;
                }
            }
            ExprKind::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.check_expr(condition, context)?;
                self.check_expr(then_value, context)?;
                self.check_expr(else_value, context)?;
            }
            ExprKind::Call {
                function,
                receiver,
                args,
            } => {
                self.check_function_id(*function, context)?;
                self.check_arity(*function, args.len(), context)?;
                if let Some(receiver) = receiver {
                    self.check_expr(receiver, context)?;
                }
                for arg in args {
                    self.check_expr(arg, context)?;
                }
            }
            ExprKind::New {
                class,
                constructor,
                args,
            } => {
                self.check_class(*class)?;
                if let Some(constructor) = constructor {
                    self.check_function_id(*constructor, context)?;
                    self.check_arity(*constructor, args.len(), context)?;
                }
                for arg in args {
                    self.check_expr(arg, context)?;
                }
            }
            ExprKind::StringMethod { receiver, args, .. } => {
                self.check_expr(receiver, context)?;
                for arg in args {
                    self.check_expr(arg, context)?;
                }
            }
        }

        Ok(())
    }

    fn check_arity(
        &self,
        function: FunctionId,
        arg_count: usize,
        context: &str,
    ) -> Result<(), CompilerError> {
        let decl = self.schema.function(function);
        let has_var_args = decl
            .params
            .last()
            .is_some_and(|param| self.schema.variable(*param).modifiers.var_args);

        let arity_ok = if has_var_args {
            arg_count + 1 >= decl.params.len()
        } else {
            arg_count == decl.params.len()
        };

        if !arity_ok {
            return_schema_error!(
                format!(
                    "Call to '{}' passes {arg_count} arguments but it declares {} parameters",
                    decl.name,
                    decl.params.len()
                ),
                ErrorLocation::at_node(context),
                {
                    FunctionName => decl.name.as_str(),
                    ExpectedCount => decl.params.len().to_string(),
                    FoundCount => arg_count.to_string(),
                }
            );
        }

        Ok(())
    }
}
