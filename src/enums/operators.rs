// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Operators Module
//!
//! Closed set of operations understood by the dispatcher, the dispatch modes,
//! and the selectors used to resolve an operation's element-level counterpart.

use std::fmt;

/// Stable identifier for every operation an [`crate::ArrayDescriptor`] can route.
///
/// The discriminant doubles as the index into a descriptor's operation table,
/// so the order below is part of the table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpId {
    // Unary operations
    Neg,
    Invert,
    Abs,
    Sqrt,
    Rcp,
    Rsqrt,
    Cbrt,

    Exp,
    Exp2,
    Log,
    Log2,

    Sin,
    Cos,
    SinCos,
    Tan,
    Asin,
    Acos,
    Atan,

    Sinh,
    Cosh,
    SinCosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,

    Erf,

    // Binary arithmetic operations
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    LShift,
    RShift,

    Minimum,
    Maximum,
    Atan2,

    // Binary bit/mask operations
    And,
    Or,
    Xor,

    // Ternary operations
    Fma,
    Select,

    // Horizontal reductions
    All,
    Any,

    // Miscellaneous
    RichCompare,
}

impl OpId {
    /// Number of entries in every operation table.
    pub const COUNT: usize = 45;

    /// All operations in table order.
    pub const ALL: [OpId; OpId::COUNT] = [
        OpId::Neg,
        OpId::Invert,
        OpId::Abs,
        OpId::Sqrt,
        OpId::Rcp,
        OpId::Rsqrt,
        OpId::Cbrt,
        OpId::Exp,
        OpId::Exp2,
        OpId::Log,
        OpId::Log2,
        OpId::Sin,
        OpId::Cos,
        OpId::SinCos,
        OpId::Tan,
        OpId::Asin,
        OpId::Acos,
        OpId::Atan,
        OpId::Sinh,
        OpId::Cosh,
        OpId::SinCosh,
        OpId::Tanh,
        OpId::Asinh,
        OpId::Acosh,
        OpId::Atanh,
        OpId::Erf,
        OpId::Add,
        OpId::Sub,
        OpId::Mul,
        OpId::TrueDiv,
        OpId::FloorDiv,
        OpId::Mod,
        OpId::LShift,
        OpId::RShift,
        OpId::Minimum,
        OpId::Maximum,
        OpId::Atan2,
        OpId::And,
        OpId::Or,
        OpId::Xor,
        OpId::Fma,
        OpId::Select,
        OpId::All,
        OpId::Any,
        OpId::RichCompare,
    ];

    /// Position of this operation inside an operation table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Diagnostic name used in error messages and for named function lookup.
    pub const fn name(self) -> &'static str {
        match self {
            OpId::Neg => "neg",
            OpId::Invert => "invert",
            OpId::Abs => "abs",
            OpId::Sqrt => "sqrt",
            OpId::Rcp => "rcp",
            OpId::Rsqrt => "rsqrt",
            OpId::Cbrt => "cbrt",
            OpId::Exp => "exp",
            OpId::Exp2 => "exp2",
            OpId::Log => "log",
            OpId::Log2 => "log2",
            OpId::Sin => "sin",
            OpId::Cos => "cos",
            OpId::SinCos => "sincos",
            OpId::Tan => "tan",
            OpId::Asin => "asin",
            OpId::Acos => "acos",
            OpId::Atan => "atan",
            OpId::Sinh => "sinh",
            OpId::Cosh => "cosh",
            OpId::SinCosh => "sincosh",
            OpId::Tanh => "tanh",
            OpId::Asinh => "asinh",
            OpId::Acosh => "acosh",
            OpId::Atanh => "atanh",
            OpId::Erf => "erf",
            OpId::Add => "add",
            OpId::Sub => "sub",
            OpId::Mul => "mul",
            OpId::TrueDiv => "truediv",
            OpId::FloorDiv => "floordiv",
            OpId::Mod => "mod",
            OpId::LShift => "lshift",
            OpId::RShift => "rshift",
            OpId::Minimum => "minimum",
            OpId::Maximum => "maximum",
            OpId::Atan2 => "atan2",
            OpId::And => "and",
            OpId::Or => "or",
            OpId::Xor => "xor",
            OpId::Fma => "fma",
            OpId::Select => "select",
            OpId::All => "all",
            OpId::Any => "any",
            OpId::RichCompare => "richcmp",
        }
    }

    /// Reverse of [`OpId::name`].
    pub fn from_name(name: &str) -> Option<OpId> {
        OpId::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Number of operands the operation consumes.
    pub const fn arity(self) -> usize {
        match self {
            OpId::Add
            | OpId::Sub
            | OpId::Mul
            | OpId::TrueDiv
            | OpId::FloorDiv
            | OpId::Mod
            | OpId::LShift
            | OpId::RShift
            | OpId::Minimum
            | OpId::Maximum
            | OpId::Atan2
            | OpId::And
            | OpId::Or
            | OpId::Xor
            | OpId::RichCompare => 2,
            OpId::Fma | OpId::Select => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How [`crate::apply`] picks its result type and whether it may alias operand 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ApplyMode {
    /// Result has the representative type; operands are untouched.
    #[default]
    Normal,
    /// Result is written into operand 0, reusing its storage when legal.
    InPlace,
    /// Operand 0 is a mask; the result type comes from operand 1.
    Select,
    /// Result has the representative type's mask type.
    RichCompare,
}

impl ApplyMode {
    /// Mode used for calls nested below this one. Only the outermost frame
    /// performs in-place aliasing.
    #[inline]
    pub fn nested(self) -> ApplyMode {
        match self {
            ApplyMode::InPlace => ApplyMode::Normal,
            other => other,
        }
    }

    /// Index of the operand whose type represents the operation.
    #[inline]
    pub fn representative(self) -> usize {
        match self {
            ApplyMode::Select => 1,
            _ => 0,
        }
    }
}

/// Rich comparison selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    /// `true` for `<`, `<=`, `>` and `>=`.
    #[inline]
    pub const fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

/// Selects the element-level counterpart the generic loop calls per position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The element type's own implementation of the operation.
    Method,
    /// A function registered under this name in the [`crate::Registry`].
    Function(&'static str),
    /// Rich comparison with the given selector.
    Compare(CompareOp),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_discriminants() {
        assert_eq!(OpId::ALL.len(), OpId::COUNT);
        for (i, op) in OpId::ALL.iter().enumerate() {
            assert_eq!(op.index(), i, "{op} out of place");
        }
    }

    #[test]
    fn test_names_are_unique_and_round_trip() {
        for op in OpId::ALL {
            assert_eq!(OpId::from_name(op.name()), Some(op));
        }
        assert_eq!(OpId::from_name("nope"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(OpId::Sqrt.arity(), 1);
        assert_eq!(OpId::Add.arity(), 2);
        assert_eq!(OpId::Fma.arity(), 3);
        assert_eq!(OpId::Select.arity(), 3);
    }

    #[test]
    fn test_nested_mode_drops_in_place() {
        assert_eq!(ApplyMode::InPlace.nested(), ApplyMode::Normal);
        assert_eq!(ApplyMode::Select.nested(), ApplyMode::Select);
        assert_eq!(ApplyMode::Select.representative(), 1);
        assert_eq!(ApplyMode::RichCompare.representative(), 0);
    }
}
