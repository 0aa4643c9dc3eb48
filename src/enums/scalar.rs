// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Scalar Module - *Single Element Container*
//!
//! Contains the Scalar type for holding one element of a flat array.
//!
//! ## Purpose
//! - Elements fetched by the generic loop from flat arrays arrive as `Scalar`.
//! - Used for lifting bare numbers into arrays during type promotion.

use std::fmt;

/// Physical element type of a flat array.
///
/// Ordered by promotion rank: when two kinds meet, the higher one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Boolean,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarKind {
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Boolean => "bool",
            ScalarKind::Int32 => "int32",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::Int32 | ScalarKind::UInt32 | ScalarKind::Int64 | ScalarKind::UInt64
        )
    }

    /// Zero of this kind.
    pub const fn zero(self) -> Scalar {
        match self {
            ScalarKind::Boolean => Scalar::Boolean(false),
            ScalarKind::Int32 => Scalar::Int32(0),
            ScalarKind::UInt32 => Scalar::UInt32(0),
            ScalarKind::Int64 => Scalar::Int64(0),
            ScalarKind::UInt64 => Scalar::UInt64(0),
            ScalarKind::Float32 => Scalar::Float32(0.0),
            ScalarKind::Float64 => Scalar::Float64(0.0),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// # Scalar
///
/// Scalar literals (single values) covering every flat element kind.
///
/// ## Description
/// - Includes accessor methods to avoid needing to match to a known type.
/// - `cast` converts between kinds with `as` semantics, matching how the
/// flat-array setters store incoming elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Scalar {
    #[inline]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Boolean(_) => ScalarKind::Boolean,
            Scalar::Int32(_) => ScalarKind::Int32,
            Scalar::UInt32(_) => ScalarKind::UInt32,
            Scalar::Int64(_) => ScalarKind::Int64,
            Scalar::UInt64(_) => ScalarKind::UInt64,
            Scalar::Float32(_) => ScalarKind::Float32,
            Scalar::Float64(_) => ScalarKind::Float64,
        }
    }

    /// Casts the value to a bool
    ///
    /// Any non-zero value becomes `true`.
    #[inline]
    pub fn bool(&self) -> bool {
        match *self {
            Scalar::Boolean(v) => v,
            Scalar::Int32(v) => v != 0,
            Scalar::UInt32(v) => v != 0,
            Scalar::Int64(v) => v != 0,
            Scalar::UInt64(v) => v != 0,
            Scalar::Float32(v) => v != 0.0,
            Scalar::Float64(v) => v != 0.0,
        }
    }

    #[inline]
    pub fn f64(&self) -> f64 {
        match *self {
            Scalar::Boolean(v) => v as u8 as f64,
            Scalar::Int32(v) => v as f64,
            Scalar::UInt32(v) => v as f64,
            Scalar::Int64(v) => v as f64,
            Scalar::UInt64(v) => v as f64,
            Scalar::Float32(v) => v as f64,
            Scalar::Float64(v) => v,
        }
    }

    #[inline]
    pub fn i64(&self) -> i64 {
        match *self {
            Scalar::Boolean(v) => v as i64,
            Scalar::Int32(v) => v as i64,
            Scalar::UInt32(v) => v as i64,
            Scalar::Int64(v) => v,
            Scalar::UInt64(v) => v as i64,
            Scalar::Float32(v) => v as i64,
            Scalar::Float64(v) => v as i64,
        }
    }

    #[inline]
    pub fn u64(&self) -> u64 {
        match *self {
            Scalar::Boolean(v) => v as u64,
            Scalar::Int32(v) => v as u64,
            Scalar::UInt32(v) => v as u64,
            Scalar::Int64(v) => v as u64,
            Scalar::UInt64(v) => v,
            Scalar::Float32(v) => v as u64,
            Scalar::Float64(v) => v as u64,
        }
    }

    /// Converts to `kind` using `as` semantics.
    pub fn cast(self, kind: ScalarKind) -> Scalar {
        if self.kind() == kind {
            return self;
        }
        match kind {
            ScalarKind::Boolean => Scalar::Boolean(self.bool()),
            ScalarKind::Int32 => Scalar::Int32(self.i64() as i32),
            ScalarKind::UInt32 => Scalar::UInt32(self.u64() as u32),
            ScalarKind::Int64 => Scalar::Int64(self.i64()),
            ScalarKind::UInt64 => Scalar::UInt64(self.u64()),
            ScalarKind::Float32 => Scalar::Float32(self.f64() as f32),
            ScalarKind::Float64 => Scalar::Float64(self.f64()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::UInt32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::UInt64(v) => write!(f, "{}", v),
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_scalar_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for Scalar {
                #[inline]
                fn from(v: $t) -> Self {
                    Scalar::$variant(v)
                }
            }
        )+
    };
}

impl_scalar_from!(
    bool => Boolean,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);
