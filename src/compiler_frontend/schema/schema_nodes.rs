//! ============================================================
//!                       Schema Nodes
//! ============================================================
//! The parsed, type-checked program handed to the dataflow pass.
//!  - Every declaration has a stable ID into one of the schema arenas
//!  - Statements and expressions are plain trees owned by their function
//!  - Override links and declaring scopes are already resolved
//!
//! The schema is read-only for the analysis. Everything the analysis learns
//! is written into its own record table keyed by these IDs.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================
// Stable IDs
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

// ============================================================
// Schema
// ============================================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub units: Vec<CompilationUnit>,
    pub classes: Vec<ClassDecl>,
    pub functions: Vec<FunctionDecl>,
    pub variables: Vec<VariableDecl>,
}

impl Schema {
    pub fn unit(&self, id: UnitId) -> &CompilationUnit {
        &self.units[id.0 as usize]
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.0 as usize]
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.0 as usize]
    }

    pub fn variable(&self, id: VarId) -> &VariableDecl {
        &self.variables[id.0 as usize]
    }

    /// True when `class` is `ancestor` or derives from it.
    pub fn is_subclass_of(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.class(id).base;
        }

        false
    }

    /// Directory of the unit that declares a class.
    pub fn class_directory(&self, class: ClassId) -> &str {
        &self.unit(self.class(class).unit).directory
    }
}

// ============================================================
// Compilation units
// ============================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub id: UnitId,
    pub path: String,

    /// Source directory. Package-level visibility is scoped by this.
    pub directory: String,

    pub classes: Vec<ClassId>,
    pub functions: Vec<FunctionId>,
    pub globals: Vec<VarId>,
}

// ============================================================
// Classes
// ============================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub id: ClassId,
    pub name: String,
    pub unit: UnitId,
    pub base: Option<ClassId>,

    /// Members in source order.
    pub members: Vec<ClassMember>,
}

impl ClassDecl {
    pub fn fields(&self) -> impl Iterator<Item = VarId> + '_ {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Field(var) => Some(*var),
            _ => None,
        })
    }

    pub fn constructors(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Constructor(function) => Some(*function),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Method(function) => Some(*function),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassMember {
    Field(VarId),
    Constructor(FunctionId),
    Method(FunctionId),
}

// ============================================================
// Functions
// ============================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub id: FunctionId,
    pub name: String,
    pub kind: FunctionKind,
    pub unit: UnitId,
    pub class: Option<ClassId>,
    pub is_virtual: bool,
    pub is_static: bool,
    pub params: Vec<VarId>,

    /// Implicit variable holding the return value. None for void functions and constructors.
    pub return_var: Option<VarId>,

    /// None for built-ins, whose X/Z behaviour is trusted from annotations.
    pub body: Option<Block>,

    /// The function this one directly overrides.
    pub overrides: Option<FunctionId>,

    /// Built-in annotation: the return value may carry X/Z.
    #[serde(default)]
    pub returns_xz: bool,
}

impl FunctionDecl {
    pub fn is_builtin(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Task,
    Method,
    Constructor,
}

// ============================================================
// Variables
// ============================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub id: VarId,
    pub name: String,
    pub ty: DataType,
    pub scope: VarScope,

    #[serde(default)]
    pub modifiers: VarModifiers,

    /// Built-in parameter annotation: the argument may carry X/Z.
    #[serde(default)]
    pub declares_xz: bool,

    pub initializer: Option<Expr>,
}

impl VariableDecl {
    pub fn is_field(&self) -> bool {
        matches!(self.scope, VarScope::Field(_))
    }

    pub fn is_param(&self) -> bool {
        matches!(self.scope, VarScope::Param { .. })
    }

    pub fn is_local(&self) -> bool {
        matches!(self.scope, VarScope::Local(_))
    }

    /// Non-static fields of a class instance.
    pub fn is_instance_field(&self) -> bool {
        self.is_field() && !self.modifiers.is_static
    }

    pub fn declaring_class(&self) -> Option<ClassId> {
        match self.scope {
            VarScope::Field(class) => Some(class),
            _ => None,
        }
    }

    pub fn declaring_function(&self) -> Option<FunctionId> {
        match self.scope {
            VarScope::Param { function, .. }
            | VarScope::Local(function)
            | VarScope::ReturnValue(function) => Some(function),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarScope {
    Global(UnitId),
    Field(ClassId),
    Param { function: FunctionId, index: usize },
    Local(FunctionId),
    ReturnValue(FunctionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VarModifiers {
    pub is_static: bool,
    pub shadow: bool,
    pub by_ref: bool,
    pub var_args: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bit { width: u32 },
    Integer,
    Bool,
    String,
    Enum(String),
    Class(ClassId),
    Event,
    Void,
    Array(Box<DataType>),
    AssocArray(Box<DataType>),
}

impl DataType {
    /// Four-valued types are the only ones that can observe X or Z.
    pub fn is_four_valued(&self) -> bool {
        match self {
            DataType::Bit { .. } | DataType::Integer => true,
            DataType::Array(inner) | DataType::AssocArray(inner) => inner.is_four_valued(),
            _ => false,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DataType::Bit { .. } | DataType::Integer | DataType::Bool | DataType::Enum(_)
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }
}

// ============================================================
// Statements
// ============================================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Block(Block),

    /// Declares a local. The initializer lives on the VariableDecl.
    VarDecl(VarId),

    Expr(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },

    For {
        init: Vec<Stmt>,
        condition: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },

    /// Runs the body `count` times, zero included.
    Repeat {
        count: Expr,
        body: Box<Stmt>,
    },

    Fork {
        branches: Vec<Stmt>,
        join: JoinKind,
    },

    Case {
        subject: Expr,
        items: Vec<CaseItem>,
        default: Option<Box<Stmt>>,
    },

    RandCase {
        items: Vec<RandCaseItem>,
    },

    Break,
    Continue,
    Return(Option<Expr>),

    /// Blocks until any of the given variables changes.
    WaitVar(Vec<Expr>),

    /// Explicit `super.new(...)` call, only valid at the start of a constructor.
    SuperNew {
        constructor: Option<FunctionId>,
        args: Vec<Expr>,
    },

    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    All,
    Any,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseItem {
    pub labels: Vec<Expr>,
    pub body: Stmt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandCaseItem {
    pub weight: Expr,
    pub body: Stmt,
}

// ============================================================
// Expressions
// ============================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: DataType,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: DataType) -> Self {
        Self { kind, ty }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),

    EnumConst {
        name: String,
        value: i64,
    },

    Var(VarId),

    This,

    Field {
        object: Box<Expr>,
        field: VarId,
    },

    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    Slice {
        base: Box<Expr>,
        high: Box<Expr>,
        low: Box<Expr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    Concat(Vec<Expr>),

    Conditional {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },

    Cast(Box<Expr>),

    Call {
        function: FunctionId,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },

    New {
        class: ClassId,
        constructor: Option<FunctionId>,
        args: Vec<Expr>,
    },

    StringMethod {
        receiver: Box<Expr>,
        method: StringMethod,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),

    /// Sized bit literal. `has_xz` is set when any digit is x or z.
    Bit {
        value: u64,
        width: u32,
        has_xz: bool,
    },

    Bool(bool),
    String(String),
    Null,
}

impl Literal {
    /// The truth value of a literal used as a condition, when it is a compile-time constant.
    pub fn constant_truth(&self) -> Option<bool> {
        match self {
            Literal::Int(value) => Some(*value != 0),
            Literal::Bit { has_xz: true, .. } => None,
            Literal::Bit { value, .. } => Some(*value != 0),
            Literal::Bool(value) => Some(*value),
            Literal::Null => Some(false),
            Literal::String(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    BitNot,
    LogicalNot,
    ReduceAnd,
    ReduceOr,
    ReduceXor,
    ReduceNand,
    ReduceNor,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ExactEq,
    ExactNe,
    WildEq,
    WildNe,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Plain,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringMethod {
    Len,
    Substr,
    ToUpper,
    ToLower,
    Compare,

    // Regular expression matcher. These leave state behind on the string object.
    Match,
    Search,

    // Read the state left by the last match.
    Prematch,
    Postmatch,
    Thismatch,
    Backref,
}

impl StringMethod {
    pub fn writes_matcher_state(self) -> bool {
        matches!(self, StringMethod::Match | StringMethod::Search)
    }

    pub fn reads_matcher_state(self) -> bool {
        matches!(
            self,
            StringMethod::Prematch
                | StringMethod::Postmatch
                | StringMethod::Thismatch
                | StringMethod::Backref
        )
    }
}
