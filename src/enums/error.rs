// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Error Module - Custom *Minapply* Error Type
//!
//! Defines the unified error type for dispatch and tree walking.
//!
//! ## Features
//! - [`ErrorKind`] names the root cause: size, rank and shape reconciliation
//! failures, structural mismatches, element access and assignment failures,
//! and failures of the element-level counterpart.
//! - [`DispatchError`] pairs the root cause with the context trail collected
//! while the error travels back up through each recursion frame.
//! - Both implement `Display` for readable output and `Error` for integration
//! with standard Rust error handling.

use std::fmt;

use thiserror::Error;

/// Root cause of a failed dispatch or walk.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    /// Broadcast-incompatible element counts.
    #[error("invalid input array sizes ({})", join_sizes(.sizes))]
    SizeIncompatible { sizes: Vec<usize> },

    /// A tensor operand's nonzero rank differs from the common rank.
    #[error("Operands have incompatible ranks: {}.", join_shapes(.shapes))]
    RankIncompatible { shapes: Vec<Vec<usize>> },

    /// Extents along some axis are neither equal nor 1.
    #[error("Operands have incompatible shapes: {}.", join_shapes(.shapes))]
    ShapeIncompatible { shapes: Vec<Vec<usize>> },

    /// Paired or transformed trees disagree in kind, length or keys.
    #[error("{0}")]
    StructuralMismatch(String),

    /// The element accessor signalled failure.
    #[error("Item retrieval failed at index {index}!")]
    ItemAccess { index: usize },

    /// The element assignment accessor rejected a value.
    #[error("Item assignment failed at index {index} (value of type '{found}')!")]
    ItemAssign { index: usize, found: String },

    /// The element-level counterpart could not be computed.
    #[error("Nested operation failed: {op} is not defined for {operands}")]
    NestedOperation { op: &'static str, operands: String },

    /// Operand types could not be promoted to a common representation.
    #[error("cannot promote '{from}' to '{to}'")]
    Unification { from: String, to: String },

    /// Ordering comparison on a type that only supports equality.
    #[error(
        "Inequality comparisons are only permitted on ordinary arithmetic arrays. \
         They are suppressed for complex arrays, quaternions, matrices, and arrays of pointers."
    )]
    InvalidComparison,

    /// `Slot::Function` named something the registry does not know.
    #[error("no function named '{0}' is registered")]
    UnknownFunction(String),

    /// Wrong operand count for the operation or kernel.
    #[error("{op} expects {expected} operand(s), got {found}")]
    Arity { op: &'static str, expected: usize, found: usize },

    /// A native kernel reported failure.
    #[error("kernel failed: {0}")]
    Kernel(String),

    /// A tensor accessor was used on a value that is not a tensor.
    #[error("'{0}' is not a tensor type")]
    NotATensor(String),

    /// A value has no type the operation can work with.
    #[error("Type error: {0}")]
    TypeError(String),
}

/// One step of the context trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Dispatch through the representative type's own method, e.g. `Float32X.add()`.
    Method { type_name: String, op: &'static str },
    /// Dispatch through a named function, e.g. `minapply.sqrt(<Float32X>)`.
    Function { name: &'static str, type_name: String },
    /// Generic-loop position whose element-level call failed.
    Element(usize),
    /// Tree walker frame.
    Walk { op: String, types: Vec<String> },
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Method { type_name, op } => write!(f, "{}.{}()", type_name, op),
            Frame::Function { name, type_name } => {
                write!(f, "minapply.{}(<{}>)", name, type_name)
            }
            Frame::Element(index) => write!(f, "element {}", index),
            Frame::Walk { op, types } => match types.as_slice() {
                [one] => write!(
                    f,
                    "{}(): error encountered while processing an argument of type '{}'",
                    op, one
                ),
                many => {
                    let quoted: Vec<String> = many.iter().map(|t| format!("'{}'", t)).collect();
                    write!(
                        f,
                        "{}(): error encountered while processing arguments of type {}",
                        op,
                        quoted.join(" and ")
                    )
                }
            },
        }
    }
}

/// Catch all error type for dispatch and tree walking.
///
/// The context is stored innermost first; `Display` renders it outermost
/// first, ending with the root cause.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchError {
    kind: ErrorKind,
    context: Vec<Frame>,
}

impl DispatchError {
    pub fn new(kind: ErrorKind) -> Self {
        DispatchError { kind, context: Vec::new() }
    }

    /// Root cause.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Context trail, innermost frame first.
    pub fn context(&self) -> &[Frame] {
        &self.context
    }

    /// Adds the frame the error is escaping from.
    pub fn within(mut self, frame: Frame) -> Self {
        self.context.push(frame);
        self
    }
}

impl From<ErrorKind> for DispatchError {
    fn from(kind: ErrorKind) -> Self {
        DispatchError::new(kind)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.context.iter().rev() {
            write!(f, "{}: ", frame)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

fn join_sizes(sizes: &[usize]) -> String {
    let parts: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
    join_list(&parts)
}

fn join_shapes(shapes: &[Vec<usize>]) -> String {
    let parts: Vec<String> = shapes.iter().map(|s| format!("{:?}", s)).collect();
    join_list(&parts)
}

/// `a`, `a and b`, `a, b, and c`.
fn join_list(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{} and {}", a, b),
        [head @ .., last] => format!("{}, and {}", head.join(", "), last),
    }
}
