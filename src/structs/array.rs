// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Array Module
//!
//! Storage for instances of registered array types.
//!
//! An [`Array`] pairs the [`TypeKey`] of its descriptor with an [`ArrayData`]
//! payload. Flat payloads keep their elements in 64-byte aligned `Vec64`
//! buffers; nested payloads hold one [`Value`] per element; tensors hold a
//! flat backing array plus a shape.
//!
//! Freshly allocated results start life as an [`UninitArray`], which a native
//! kernel or the generic loop fills before calling [`UninitArray::mark_ready`].

use std::sync::Arc;

use vec64::Vec64;

use crate::enums::scalar::{Scalar, ScalarKind};
use crate::enums::value::Value;
use crate::structs::descriptor::TypeKey;

/// Backing storage of an [`Array`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Boolean(Vec64<bool>),
    Int32(Vec64<i32>),
    UInt32(Vec64<u32>),
    Int64(Vec64<i64>),
    UInt64(Vec64<u64>),
    Float32(Vec64<f32>),
    Float64(Vec64<f64>),
    /// Elements that are themselves values, e.g. the components of a 3-vector of arrays.
    Nested(Vec<Value>),
    /// Flat array interpreted through `shape`.
    Tensor { array: Arc<Array>, shape: Vec<usize> },
}

/// Runs `$body` with `$v` bound to the flat buffer, whatever its element type.
macro_rules! with_flat {
    ($data:expr, $v:ident => $body:expr, _ => $other:expr) => {
        match $data {
            ArrayData::Boolean($v) => $body,
            ArrayData::Int32($v) => $body,
            ArrayData::UInt32($v) => $body,
            ArrayData::Int64($v) => $body,
            ArrayData::UInt64($v) => $body,
            ArrayData::Float32($v) => $body,
            ArrayData::Float64($v) => $body,
            _ => $other,
        }
    };
}

impl ArrayData {
    /// Empty flat buffer of the given element kind.
    pub fn empty_flat(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Boolean => ArrayData::Boolean(Vec64::new()),
            ScalarKind::Int32 => ArrayData::Int32(Vec64::new()),
            ScalarKind::UInt32 => ArrayData::UInt32(Vec64::new()),
            ScalarKind::Int64 => ArrayData::Int64(Vec64::new()),
            ScalarKind::UInt64 => ArrayData::UInt64(Vec64::new()),
            ScalarKind::Float32 => ArrayData::Float32(Vec64::new()),
            ScalarKind::Float64 => ArrayData::Float64(Vec64::new()),
        }
    }

    /// Flat buffer of `len` zeros.
    pub fn zeros(kind: ScalarKind, len: usize) -> Self {
        let mut data = ArrayData::empty_flat(kind);
        data.resize_flat(len);
        data
    }

    /// Element kind of a flat buffer.
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            ArrayData::Boolean(_) => Some(ScalarKind::Boolean),
            ArrayData::Int32(_) => Some(ScalarKind::Int32),
            ArrayData::UInt32(_) => Some(ScalarKind::UInt32),
            ArrayData::Int64(_) => Some(ScalarKind::Int64),
            ArrayData::UInt64(_) => Some(ScalarKind::UInt64),
            ArrayData::Float32(_) => Some(ScalarKind::Float32),
            ArrayData::Float64(_) => Some(ScalarKind::Float64),
            ArrayData::Nested(_) | ArrayData::Tensor { .. } => None,
        }
    }

    /// Top-level element count. For tensors this is the flat length.
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Nested(items) => items.len(),
            ArrayData::Tensor { array, .. } => array.len(),
            flat => with_flat!(flat, v => v.len(), _ => 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`. Tensors are only reachable through their flat array.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            ArrayData::Boolean(v) => v.get(index).map(|x| Value::Scalar(Scalar::Boolean(*x))),
            ArrayData::Int32(v) => v.get(index).map(|x| Value::Scalar(Scalar::Int32(*x))),
            ArrayData::UInt32(v) => v.get(index).map(|x| Value::Scalar(Scalar::UInt32(*x))),
            ArrayData::Int64(v) => v.get(index).map(|x| Value::Scalar(Scalar::Int64(*x))),
            ArrayData::UInt64(v) => v.get(index).map(|x| Value::Scalar(Scalar::UInt64(*x))),
            ArrayData::Float32(v) => v.get(index).map(|x| Value::Scalar(Scalar::Float32(*x))),
            ArrayData::Float64(v) => v.get(index).map(|x| Value::Scalar(Scalar::Float64(*x))),
            ArrayData::Nested(items) => items.get(index).cloned(),
            ArrayData::Tensor { .. } => None,
        }
    }

    /// Stores `value` at `index`, handing it back when it cannot be stored.
    ///
    /// Flat buffers accept any scalar and cast it to their element kind.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), Value> {
        if index >= self.len() {
            return Err(value);
        }
        let scalar = match (&mut *self, value) {
            (ArrayData::Nested(items), value) => {
                items[index] = value;
                return Ok(());
            }
            (ArrayData::Tensor { .. }, value) | (_, value @ Value::Array(_)) => return Err(value),
            (_, Value::Scalar(s)) => s,
        };
        match self {
            ArrayData::Boolean(v) => v[index] = scalar.bool(),
            ArrayData::Int32(v) => v[index] = scalar.i64() as i32,
            ArrayData::UInt32(v) => v[index] = scalar.u64() as u32,
            ArrayData::Int64(v) => v[index] = scalar.i64(),
            ArrayData::UInt64(v) => v[index] = scalar.u64(),
            ArrayData::Float32(v) => v[index] = scalar.f64() as f32,
            ArrayData::Float64(v) => v[index] = scalar.f64(),
            ArrayData::Nested(_) | ArrayData::Tensor { .. } => {}
        }
        Ok(())
    }

    /// Elements at `index`, in order. `None` if an index is out of range or
    /// the storage is a tensor.
    pub fn gather(&self, index: &[usize]) -> Option<ArrayData> {
        fn pick<T: Copy>(v: &[T], index: &[usize]) -> Option<Vec64<T>> {
            index.iter().map(|&i| v.get(i).copied()).collect()
        }
        Some(match self {
            ArrayData::Boolean(v) => ArrayData::Boolean(pick(v, index)?),
            ArrayData::Int32(v) => ArrayData::Int32(pick(v, index)?),
            ArrayData::UInt32(v) => ArrayData::UInt32(pick(v, index)?),
            ArrayData::Int64(v) => ArrayData::Int64(pick(v, index)?),
            ArrayData::UInt64(v) => ArrayData::UInt64(pick(v, index)?),
            ArrayData::Float32(v) => ArrayData::Float32(pick(v, index)?),
            ArrayData::Float64(v) => ArrayData::Float64(pick(v, index)?),
            ArrayData::Nested(items) => ArrayData::Nested(
                index.iter().map(|&i| items.get(i).cloned()).collect::<Option<Vec<_>>>()?,
            ),
            ArrayData::Tensor { .. } => return None,
        })
    }

    /// Resizes a flat buffer to `len`, zero-filling new slots.
    pub fn resize_flat(&mut self, len: usize) {
        with_flat!(self, v => v.0.resize(len, Default::default()), _ => ())
    }
}

/// # Array
///
/// Instance of a registered array type.
///
/// Holds the key of its [`crate::ArrayDescriptor`] so the dispatcher can look
/// up the type's capabilities once per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    ty: TypeKey,
    data: ArrayData,
}

impl Array {
    pub fn new(ty: TypeKey, data: ArrayData) -> Self {
        Array { ty, data }
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.ty
    }

    #[inline]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }

    #[inline]
    pub fn into_data(self) -> ArrayData {
        self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat array and shape of a tensor.
    pub fn tensor_parts(&self) -> Option<(&Arc<Array>, &[usize])> {
        match &self.data {
            ArrayData::Tensor { array, shape } => Some((array, shape.as_slice())),
            _ => None,
        }
    }

    /// Elements of a nested array.
    pub fn items(&self) -> Option<&[Value]> {
        match &self.data {
            ArrayData::Nested(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Address of the first element of a flat buffer, or of the element list.
    ///
    /// Used to observe whether storage was reused or reallocated.
    pub fn storage_ptr(&self) -> *const u8 {
        match &self.data {
            ArrayData::Nested(items) => items.as_ptr() as *const u8,
            ArrayData::Tensor { array, .. } => array.storage_ptr(),
            flat => with_flat!(flat, v => v.as_ptr() as *const u8, _ => std::ptr::null()),
        }
    }
}

macro_rules! impl_flat_view {
    ($($fn_name:ident => $variant:ident, $t:ty);+ $(;)?) => {
        impl Array {
            $(
                #[doc = concat!("Elements as `&[", stringify!($t), "]` when the buffer holds that kind.")]
                #[inline]
                pub fn $fn_name(&self) -> Option<&[$t]> {
                    match &self.data {
                        ArrayData::$variant(v) => Some(v.as_slice()),
                        _ => None,
                    }
                }
            )+
        }
    };
}

impl_flat_view!(
    as_bool => Boolean, bool;
    as_i32 => Int32, i32;
    as_u32 => UInt32, u32;
    as_i64 => Int64, i64;
    as_u64 => UInt64, u64;
    as_f32 => Float32, f32;
    as_f64 => Float64, f64;
);

macro_rules! impl_data_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<Vec<$t>> for ArrayData {
                fn from(v: Vec<$t>) -> Self {
                    ArrayData::$variant(Vec64::from(v))
                }
            }

            impl From<&[$t]> for ArrayData {
                fn from(v: &[$t]) -> Self {
                    ArrayData::$variant(Vec64::from(v))
                }
            }

            impl From<Vec64<$t>> for ArrayData {
                fn from(v: Vec64<$t>) -> Self {
                    ArrayData::$variant(v)
                }
            }
        )+
    };
}

impl_data_from!(
    bool => Boolean,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

impl From<Vec<Value>> for ArrayData {
    fn from(items: Vec<Value>) -> Self {
        ArrayData::Nested(items)
    }
}

/// Result storage that has been allocated but not yet filled.
///
/// Only [`UninitArray::mark_ready`] turns it into an [`Array`], so a result is
/// never handed out while a kernel is still writing into it.
#[derive(Debug)]
pub struct UninitArray(Array);

impl UninitArray {
    pub(crate) fn new(array: Array) -> Self {
        UninitArray(array)
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.0.ty
    }

    /// Storage the kernel writes into.
    #[inline]
    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.0.data
    }

    #[inline]
    pub(crate) fn array_mut(&mut self) -> &mut Array {
        &mut self.0
    }

    /// Finishes construction.
    #[inline]
    pub fn mark_ready(self) -> Array {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TypeKey {
        TypeKey::from_index(0)
    }

    #[test]
    fn test_flat_get_set_casts_scalars() {
        let mut data = ArrayData::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(data.get(1), Some(Value::Scalar(Scalar::Float32(2.0))));
        data.set(1, Value::Scalar(Scalar::Int32(7))).unwrap();
        assert_eq!(data.get(1), Some(Value::Scalar(Scalar::Float32(7.0))));
        assert!(data.get(3).is_none());
    }

    #[test]
    fn test_set_out_of_range_returns_value() {
        let mut data = ArrayData::from(vec![1i32]);
        let rejected = data.set(4, Value::Scalar(Scalar::Int32(9))).unwrap_err();
        assert_eq!(rejected, Value::Scalar(Scalar::Int32(9)));
    }

    #[test]
    fn test_flat_rejects_array_values() {
        let inner = Value::Array(Arc::new(Array::new(key(), ArrayData::from(vec![1.0f32]))));
        let mut data = ArrayData::from(vec![0.0f32]);
        assert!(data.set(0, inner).is_err());
    }

    #[test]
    fn test_zeros_and_resize() {
        let mut data = ArrayData::zeros(ScalarKind::Int64, 3);
        assert_eq!(data.len(), 3);
        data.resize_flat(5);
        assert_eq!(data.get(4), Some(Value::Scalar(Scalar::Int64(0))));
    }

    #[test]
    fn test_uninit_marks_ready() {
        let mut out = UninitArray::new(Array::new(key(), ArrayData::empty_flat(ScalarKind::Float64)));
        *out.data_mut() = ArrayData::from(vec![4.0f64, 5.0]);
        let ready = out.mark_ready();
        assert_eq!(ready.as_f64(), Some(&[4.0, 5.0][..]));
    }
}
