//! Programmatic schema construction.
//!
//! The parser normally produces the schema, but tools embedding the analysis (and the tests)
//! need to build small programs by hand. IDs are handed out in arena order so the result
//! always indexes cleanly.

use crate::compiler_frontend::schema::schema_nodes::{
    AssignOp, BinaryOp, Block, CaseItem, ClassDecl, ClassId, ClassMember, CompilationUnit,
    DataType, Expr, ExprKind, FunctionDecl, FunctionId, FunctionKind, JoinKind, Literal,
    RandCaseItem, Schema, Stmt, StringMethod, UnaryOp, UnitId, VarId, VarModifiers, VarScope,
    VariableDecl,
};

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Schema {
        self.schema
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // --------------------------------------------------------
    // Declarations
    // --------------------------------------------------------
    pub fn unit(&mut self, path: &str, directory: &str) -> UnitId {
        let id = UnitId(self.schema.units.len() as u32);
        self.schema.units.push(CompilationUnit {
            id,
            path: path.to_owned(),
            directory: directory.to_owned(),
            classes: Vec::new(),
            functions: Vec::new(),
            globals: Vec::new(),
        });
        id
    }

    pub fn class(&mut self, unit: UnitId, name: &str, base: Option<ClassId>) -> ClassId {
        let id = ClassId(self.schema.classes.len() as u32);
        self.schema.classes.push(ClassDecl {
            id,
            name: name.to_owned(),
            unit,
            base,
            members: Vec::new(),
        });
        self.schema.units[unit.0 as usize].classes.push(id);
        id
    }

    pub fn global(&mut self, unit: UnitId, name: &str, ty: DataType) -> VarId {
        let id = self.push_variable(name, ty, VarScope::Global(unit));
        self.schema.units[unit.0 as usize].globals.push(id);
        id
    }

    pub fn field(&mut self, class: ClassId, name: &str, ty: DataType) -> VarId {
        let id = self.push_variable(name, ty, VarScope::Field(class));
        self.schema.classes[class.0 as usize]
            .members
            .push(ClassMember::Field(id));
        id
    }

    pub fn static_field(&mut self, class: ClassId, name: &str, ty: DataType) -> VarId {
        let id = self.field(class, name, ty);
        self.schema.variables[id.0 as usize].modifiers.is_static = true;
        id
    }

    /// A free function. A return type creates the implicit return variable.
    pub fn function(&mut self, unit: UnitId, name: &str, returns: Option<DataType>) -> FunctionId {
        let id = self.push_function(unit, name, FunctionKind::Function, None, returns);
        self.schema.units[unit.0 as usize].functions.push(id);
        id
    }

    pub fn task(&mut self, unit: UnitId, name: &str) -> FunctionId {
        let id = self.push_function(unit, name, FunctionKind::Task, None, None);
        self.schema.units[unit.0 as usize].functions.push(id);
        id
    }

    /// A built-in: no body, so argument and return X/Z come from annotations.
    pub fn builtin(
        &mut self,
        unit: UnitId,
        name: &str,
        returns: Option<DataType>,
        returns_xz: bool,
    ) -> FunctionId {
        let id = self.function(unit, name, returns);
        let function = &mut self.schema.functions[id.0 as usize];
        function.body = None;
        function.returns_xz = returns_xz;
        id
    }

    pub fn method(
        &mut self,
        class: ClassId,
        name: &str,
        returns: Option<DataType>,
        is_virtual: bool,
    ) -> FunctionId {
        let unit = self.schema.classes[class.0 as usize].unit;
        let id = self.push_function(unit, name, FunctionKind::Method, Some(class), returns);
        self.schema.functions[id.0 as usize].is_virtual = is_virtual;
        self.schema.classes[class.0 as usize]
            .members
            .push(ClassMember::Method(id));
        id
    }

    pub fn constructor(&mut self, class: ClassId) -> FunctionId {
        let unit = self.schema.classes[class.0 as usize].unit;
        let id = self.push_function(unit, "new", FunctionKind::Constructor, Some(class), None);
        self.schema.classes[class.0 as usize]
            .members
            .push(ClassMember::Constructor(id));
        id
    }

    pub fn param(&mut self, function: FunctionId, name: &str, ty: DataType) -> VarId {
        let index = self.schema.functions[function.0 as usize].params.len();
        let id = self.push_variable(name, ty, VarScope::Param { function, index });
        self.schema.functions[function.0 as usize].params.push(id);
        id
    }

    pub fn ref_param(&mut self, function: FunctionId, name: &str, ty: DataType) -> VarId {
        let id = self.param(function, name, ty);
        self.schema.variables[id.0 as usize].modifiers.by_ref = true;
        id
    }

    pub fn var_args_param(&mut self, function: FunctionId, name: &str, ty: DataType) -> VarId {
        let id = self.param(function, name, ty);
        self.schema.variables[id.0 as usize].modifiers.var_args = true;
        id
    }

    pub fn local(&mut self, function: FunctionId, name: &str, ty: DataType) -> VarId {
        self.push_variable(name, ty, VarScope::Local(function))
    }

    pub fn set_initializer(&mut self, var: VarId, value: Expr) {
        self.schema.variables[var.0 as usize].initializer = Some(value);
    }

    pub fn set_modifiers(&mut self, var: VarId, modifiers: VarModifiers) {
        self.schema.variables[var.0 as usize].modifiers = modifiers;
    }

    /// Built-in parameter annotation.
    pub fn declare_xz(&mut self, var: VarId) {
        self.schema.variables[var.0 as usize].declares_xz = true;
    }

    pub fn set_body(&mut self, function: FunctionId, statements: Vec<Stmt>) {
        self.schema.functions[function.0 as usize].body = Some(Block::new(statements));
    }

    pub fn set_overrides(&mut self, function: FunctionId, parent: FunctionId) {
        self.schema.functions[function.0 as usize].overrides = Some(parent);
    }

    pub fn return_var(&self, function: FunctionId) -> Option<VarId> {
        self.schema.functions[function.0 as usize].return_var
    }

    // --------------------------------------------------------
    // Typed expressions that need the declaration table
    // --------------------------------------------------------
    pub fn read(&self, var: VarId) -> Expr {
        let ty = self.schema.variables[var.0 as usize].ty.clone();
        Expr::new(ExprKind::Var(var), ty)
    }

    pub fn this(&self, class: ClassId) -> Expr {
        Expr::new(ExprKind::This, DataType::Class(class))
    }

    pub fn field_of(&self, object: Expr, field: VarId) -> Expr {
        let ty = self.schema.variables[field.0 as usize].ty.clone();
        Expr::new(
            ExprKind::Field {
                object: Box::new(object),
                field,
            },
            ty,
        )
    }

    pub fn call(&self, function: FunctionId, args: Vec<Expr>) -> Expr {
        self.call_on(function, None, args)
    }

    pub fn call_on(&self, function: FunctionId, receiver: Option<Expr>, args: Vec<Expr>) -> Expr {
        let ty = self.schema.functions[function.0 as usize]
            .return_var
            .map(|var| self.schema.variables[var.0 as usize].ty.clone())
            .unwrap_or(DataType::Void);
        Expr::new(
            ExprKind::Call {
                function,
                receiver: receiver.map(Box::new),
                args,
            },
            ty,
        )
    }

    // --------------------------------------------------------
    // Internals
    // --------------------------------------------------------
    fn push_variable(&mut self, name: &str, ty: DataType, scope: VarScope) -> VarId {
        let id = VarId(self.schema.variables.len() as u32);
        self.schema.variables.push(VariableDecl {
            id,
            name: name.to_owned(),
            ty,
            scope,
            modifiers: VarModifiers::default(),
            declares_xz: false,
            initializer: None,
        });
        id
    }

    fn push_function(
        &mut self,
        unit: UnitId,
        name: &str,
        kind: FunctionKind,
        class: Option<ClassId>,
        returns: Option<DataType>,
    ) -> FunctionId {
        let id = FunctionId(self.schema.functions.len() as u32);
        let return_var = returns.map(|ty| self.push_variable(name, ty, VarScope::ReturnValue(id)));

        self.schema.functions.push(FunctionDecl {
            id,
            name: name.to_owned(),
            kind,
            unit,
            class,
            is_virtual: false,
            is_static: false,
            params: Vec::new(),
            return_var,
            body: Some(Block::default()),
            overrides: None,
            returns_xz: false,
        });
        id
    }
}

// ============================================================
// Free constructors for expressions and statements
// ============================================================
pub fn int(value: i64) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Int(value)), DataType::Integer)
}

pub fn bits(value: u64, width: u32) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal::Bit {
            value,
            width,
            has_xz: false,
        }),
        DataType::Bit { width },
    )
}

/// A bit literal with x/z digits in it, e.g. `4'bxx01`.
pub fn xz_bits(width: u32) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal::Bit {
            value: 0,
            width,
            has_xz: true,
        }),
        DataType::Bit { width },
    )
}

pub fn boolean(value: bool) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Bool(value)), DataType::Bool)
}

pub fn string(value: &str) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal::String(value.to_owned())),
        DataType::String,
    )
}

pub fn enum_const(enum_name: &str, name: &str, value: i64) -> Expr {
    Expr::new(
        ExprKind::EnumConst {
            name: name.to_owned(),
            value,
        },
        DataType::Enum(enum_name.to_owned()),
    )
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    let ty = if op == UnaryOp::LogicalNot {
        DataType::Bool
    } else {
        operand.ty.clone()
    };
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
    )
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let ty = match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::ExactEq
        | BinaryOp::ExactNe
        | BinaryOp::WildEq
        | BinaryOp::WildNe
        | BinaryOp::LogicalAnd
        | BinaryOp::LogicalOr => DataType::Bool,
        _ => left.ty.clone(),
    };
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
    )
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Expr {
    let ty = target.ty.clone();
    Expr::new(
        ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        ty,
    )
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignOp::Plain, target, value)
}

pub fn concat(parts: Vec<Expr>) -> Expr {
    let width = parts
        .iter()
        .map(|part| match part.ty {
            DataType::Bit { width } => width,
            _ => 32,
        })
        .sum();
    Expr::new(ExprKind::Concat(parts), DataType::Bit { width })
}

pub fn index(base: Expr, index: Expr) -> Expr {
    let ty = match &base.ty {
        DataType::Array(inner) | DataType::AssocArray(inner) => (**inner).clone(),
        _ => DataType::Bit { width: 1 },
    };
    Expr::new(
        ExprKind::Index {
            base: Box::new(base),
            index: Box::new(index),
        },
        ty,
    )
}

pub fn conditional(condition: Expr, then_value: Expr, else_value: Expr) -> Expr {
    let ty = then_value.ty.clone();
    Expr::new(
        ExprKind::Conditional {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        },
        ty,
    )
}

pub fn new_object(class: ClassId, constructor: Option<FunctionId>, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::New {
            class,
            constructor,
            args,
        },
        DataType::Class(class),
    )
}

pub fn string_method(receiver: Expr, method: StringMethod, args: Vec<Expr>) -> Expr {
    let ty = match method {
        StringMethod::Len | StringMethod::Compare => DataType::Integer,
        StringMethod::Match | StringMethod::Search => DataType::Bool,
        _ => DataType::String,
    };
    Expr::new(
        ExprKind::StringMethod {
            receiver: Box::new(receiver),
            method,
            args,
        },
        ty,
    )
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

pub fn assign_stmt(target: Expr, value: Expr) -> Stmt {
    Stmt::Expr(assign(target, value))
}

pub fn block(statements: Vec<Stmt>) -> Stmt {
    Stmt::Block(Block::new(statements))
}

pub fn if_stmt(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
    Stmt::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    }
}

pub fn while_stmt(condition: Expr, body: Stmt) -> Stmt {
    Stmt::While {
        condition,
        body: Box::new(body),
    }
}

pub fn do_while_stmt(body: Stmt, condition: Expr) -> Stmt {
    Stmt::DoWhile {
        body: Box::new(body),
        condition,
    }
}

pub fn for_stmt(init: Vec<Stmt>, condition: Option<Expr>, update: Vec<Expr>, body: Stmt) -> Stmt {
    Stmt::For {
        init,
        condition,
        update,
        body: Box::new(body),
    }
}

pub fn repeat_stmt(count: Expr, body: Stmt) -> Stmt {
    Stmt::Repeat {
        count,
        body: Box::new(body),
    }
}

pub fn fork(branches: Vec<Stmt>, join: JoinKind) -> Stmt {
    Stmt::Fork { branches, join }
}

pub fn case_stmt(subject: Expr, items: Vec<(Vec<Expr>, Stmt)>, default: Option<Stmt>) -> Stmt {
    Stmt::Case {
        subject,
        items: items
            .into_iter()
            .map(|(labels, body)| CaseItem { labels, body })
            .collect(),
        default: default.map(Box::new),
    }
}

pub fn randcase(items: Vec<(Expr, Stmt)>) -> Stmt {
    Stmt::RandCase {
        items: items
            .into_iter()
            .map(|(weight, body)| RandCaseItem { weight, body })
            .collect(),
    }
}
