// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Value Module
//!
//! Contains the `Value` enum, the operand and result type of the dispatcher.
//!
//! ## Description
//! - A `Value` is either a bare [`Scalar`] or a shared handle to an [`Array`]
//! instance of some registered type.
//! - Arrays are held behind `Arc` so operands can be passed around cheaply,
//! and so in-place results can be observed as the same object via
//! [`Value::ptr_eq`].

use std::fmt;
use std::sync::Arc;

use crate::enums::scalar::{Scalar, ScalarKind};
use crate::structs::array::Array;
use crate::structs::descriptor::TypeKey;

/// # Value
///
/// Operand or result of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(Arc<Array>),
}

/// Runtime type of a [`Value`], used to decide whether operands need unifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Scalar(ScalarKind),
    Array(TypeKey),
}

impl Value {
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Scalar(s) => TypeTag::Scalar(s.kind()),
            Value::Array(a) => TypeTag::Array(a.type_key()),
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&Arc<Array>> {
        match self {
            Value::Array(a) => Some(a),
            Value::Scalar(_) => None,
        }
    }

    #[inline]
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Array(_) => None,
        }
    }

    /// Registered type of an array value.
    #[inline]
    pub fn type_key(&self) -> Option<TypeKey> {
        self.as_array().map(|a| a.type_key())
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// `true` when both values are the same array object.
    ///
    /// Scalars never share identity.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(Arc::new(a))
    }
}

impl From<Arc<Array>> for Value {
    fn from(a: Arc<Array>) -> Self {
        Value::Array(a)
    }
}

macro_rules! impl_value_from_primitive {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(v: $t) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )+
    };
}

impl_value_from_primitive!(bool, i32, u32, i64, u64, f32, f64);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Array(a) => {
                if let Some((flat, shape)) = a.tensor_parts() {
                    return write!(f, "tensor{:?}({})", shape, Value::Array(flat.clone()));
                }
                f.write_str("[")?;
                for i in 0..a.len() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match a.data().get(i) {
                        Some(v) => write!(f, "{}", v)?,
                        None => f.write_str("?")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}
