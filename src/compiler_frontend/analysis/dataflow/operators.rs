//! Per-operator shape tables.
//!
//! The expression analyzer never special-cases an operator by name except for the
//! short-circuit ones. Everything it needs to know about read/write order and X/Z
//! flow comes from these two tables.

use crate::compiler_frontend::schema::schema_nodes::{AssignOp, BinaryOp, UnaryOp};

/// Which operands an operator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignShape {
    None,

    /// Plain assignment: the target is written without being read.
    FirstWritten,

    /// Compound assignment and increment/decrement.
    FirstReadWritten,

    /// A concatenation used as an assignment target.
    AllWritten,
}

impl AssignShape {
    pub(crate) fn writes_first(self) -> bool {
        !matches!(self, AssignShape::None)
    }

    pub(crate) fn reads_target(self) -> bool {
        matches!(self, AssignShape::FirstReadWritten)
    }
}

/// Which operands can carry X/Z into the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XzShape {
    /// Exact and wildcard comparisons always yield 0 or 1.
    None,

    /// Divide, modulo and shifts: only the left operand is tracked.
    FirstOnly,

    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OperatorShape {
    pub assign: AssignShape,
    pub xz: XzShape,
}

impl OperatorShape {
    const fn new(assign: AssignShape, xz: XzShape) -> Self {
        Self { assign, xz }
    }

    /// Right-to-left when the first operand is a write target, so the write is visited last.
    pub(crate) fn evaluates_right_to_left(self) -> bool {
        self.assign.writes_first()
    }

    pub(crate) fn operand_carries_xz(self, operand_index: usize) -> bool {
        match self.xz {
            XzShape::None => false,
            XzShape::FirstOnly => operand_index == 0,
            XzShape::Any => true,
        }
    }
}

pub(crate) const fn binary_shape(op: BinaryOp) -> OperatorShape {
    match op {
        BinaryOp::ExactEq | BinaryOp::ExactNe | BinaryOp::WildEq | BinaryOp::WildNe => {
            OperatorShape::new(AssignShape::None, XzShape::None)
        }
        BinaryOp::Div | BinaryOp::Mod | BinaryOp::Shl | BinaryOp::Shr => {
            OperatorShape::new(AssignShape::None, XzShape::FirstOnly)
        }
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::LogicalAnd
        | BinaryOp::LogicalOr => OperatorShape::new(AssignShape::None, XzShape::Any),
    }
}

pub(crate) const fn unary_shape(op: UnaryOp) -> OperatorShape {
    match op {
        UnaryOp::PreIncrement
        | UnaryOp::PreDecrement
        | UnaryOp::PostIncrement
        | UnaryOp::PostDecrement => OperatorShape::new(AssignShape::FirstReadWritten, XzShape::Any),
        UnaryOp::Neg
        | UnaryOp::BitNot
        | UnaryOp::LogicalNot
        | UnaryOp::ReduceAnd
        | UnaryOp::ReduceOr
        | UnaryOp::ReduceXor
        | UnaryOp::ReduceNand
        | UnaryOp::ReduceNor => OperatorShape::new(AssignShape::None, XzShape::Any),
    }
}

/// Operand 0 is the target, operand 1 the assigned value.
pub(crate) const fn assign_shape(op: AssignOp) -> OperatorShape {
    match op {
        AssignOp::Plain => OperatorShape::new(AssignShape::FirstWritten, XzShape::Any),
        AssignOp::Div | AssignOp::Mod | AssignOp::Shl | AssignOp::Shr => {
            OperatorShape::new(AssignShape::FirstReadWritten, XzShape::FirstOnly)
        }
        AssignOp::Add
        | AssignOp::Sub
        | AssignOp::Mul
        | AssignOp::BitAnd
        | AssignOp::BitOr
        | AssignOp::BitXor => OperatorShape::new(AssignShape::FirstReadWritten, XzShape::Any),
    }
}

/// Concatenation written as an assignment target.
pub(crate) const CONCAT_TARGET_SHAPE: OperatorShape =
    OperatorShape::new(AssignShape::AllWritten, XzShape::Any);
