// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # ShapeDim Enum Module
//!
//! Static top-level extent of an array type, as declared by its
//! [`crate::ArrayDescriptor`].

use std::fmt;

/// Top-level extent of every instance of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeDim {
    /// Every instance holds exactly this many elements, e.g. a 3-vector.
    Fixed(usize),

    /// Length is a property of the instance and must be queried.
    Dynamic,
}

impl ShapeDim {
    /// The static extent, if any.
    #[inline]
    pub fn fixed(&self) -> Option<usize> {
        match self {
            ShapeDim::Fixed(n) => Some(*n),
            ShapeDim::Dynamic => None,
        }
    }
}

impl fmt::Display for ShapeDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeDim::Fixed(n) => write!(f, "{}", n),
            ShapeDim::Dynamic => f.write_str("dynamic"),
        }
    }
}
