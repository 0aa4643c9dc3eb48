// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Aliases Module
//!
//! Short names for the small collections passed around on every dispatch.

use smallvec::SmallVec;

use crate::enums::value::Value;

/// Operand list of a single dispatch. Operations take at most three operands.
pub type Operands = SmallVec<[Value; 3]>;

/// Per-operand lengths collected by the generic loop.
pub type Sizes = SmallVec<[usize; 4]>;
