//! Copyright © 2025 Peter Garfield Bower. All rights reserved.
//!
//! # Minapply
//!
//! Recursive dispatch engine for element-wise operations over registered
//! array types, shaped tensors, and nested containers of both.
//!
//! ## Pieces
//! - [`Registry`] holds one [`ArrayDescriptor`] per array type: its layout,
//! static extent, element accessors, mask type, and an operation table that
//! classifies every [`OpId`] as a native kernel, the generic element loop, or
//! not implemented.
//! - [`apply`] resolves one operation on one to three operands, unifying their
//! types, broadcasting length-1 operands, and optionally writing the result
//! back into operand 0.
//! - [`apply_tensor`] reconciles tensor shapes and gathers smaller operands up
//! to the common shape before running the operation on the flat arrays.
//! - [`traverse`], [`traverse_pair`] and [`transform`] walk [`Tree`]s of lists,
//! tuples, maps and records down to their leaf arrays.
//! - Failures are [`DispatchError`]s carrying the root cause plus the trail of
//! frames they passed through.
//!
//! The `builtin_types` feature (on by default) adds [`builtin`], a registry of
//! stock types with native float and mask kernels.

pub mod enums {
    pub mod error;
    pub mod operators;
    pub mod scalar;
    pub mod shape_dim;
    pub mod tree;
    pub mod value;
}

pub mod structs {
    pub mod array;
    pub mod descriptor;
    pub mod record;
    pub mod registry;
}

pub mod traits {
    pub mod callbacks;
    pub mod custom_value;
    pub mod type_unions;
    pub mod unify;
}

pub mod kernels {
    pub mod native;
    pub mod routing;
    pub mod scalar;
}

pub mod aliases;
#[cfg(feature = "builtin_types")]
pub mod builtin;

pub use aliases::{Operands, Sizes};
pub use enums::error::{DispatchError, ErrorKind, Frame};
pub use enums::operators::{ApplyMode, CompareOp, OpId, Slot};
pub use enums::scalar::{Scalar, ScalarKind};
pub use enums::shape_dim::ShapeDim;
pub use enums::tree::Tree;
pub use enums::value::{TypeTag, Value};
pub use kernels::routing::{
    Applied, apply, apply_tensor, call_element, transform, traverse, traverse_pair,
};
pub use structs::array::{Array, ArrayData, UninitArray};
pub use structs::descriptor::{
    ArrayDescriptor, Layout, NativeKernel, OpEntry, TypeFlags, TypeKey,
};
pub use structs::record::{FieldManifest, Record};
pub use structs::registry::{ElementFn, Registry};
pub use traits::callbacks::{MapLeaves, TransformCallback, map_leaves};
pub use traits::custom_value::CustomValue;
pub use traits::type_unions::{Float, Integer};
pub use traits::unify::{PromoteUnifier, TypeUnifier};
pub use vec64::Vec64;
