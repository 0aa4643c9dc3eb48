// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Descriptor Module
//!
//! Per-type capability record consulted by the dispatcher.
//!
//! ## Overview
//! An [`ArrayDescriptor`] tells the engine everything it needs to know about one
//! array type:
//! - its storage [`Layout`] and static extent ([`ShapeDim`]),
//! - one [`OpEntry`] per [`OpId`], classifying each operation as a native
//! kernel, the generic element loop, or unsupported,
//! - element accessors and the dynamic length accessor,
//! - the associated mask type and a few [`TypeFlags`].
//!
//! Descriptors are built with the `with_*` methods and handed to
//! [`crate::Registry::register`], which assigns the [`TypeKey`].

use std::fmt;
use std::sync::Arc;

use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::operators::{CompareOp, OpId};
use crate::enums::scalar::ScalarKind;
use crate::enums::shape_dim::ShapeDim;
use crate::enums::value::Value;
use crate::structs::array::{Array, ArrayData, UninitArray};
use crate::structs::registry::Registry;

/// Identity of a registered array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u32);

impl TypeKey {
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        TypeKey(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage model of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Elements are scalars of one kind.
    Flat(ScalarKind),
    /// Elements are instances of another registered type.
    Nested(TypeKey),
    /// Shaped view over a flat array of the given type.
    Tensor(TypeKey),
}

pub type UnaryKernel = fn(&Array, &mut UninitArray) -> Result<(), ErrorKind>;
pub type BinaryKernel = fn(&Array, &Array, &mut UninitArray) -> Result<(), ErrorKind>;
pub type TernaryKernel = fn(&Array, &Array, &Array, &mut UninitArray) -> Result<(), ErrorKind>;
pub type CompareKernel = fn(&Array, &Array, CompareOp, &mut UninitArray) -> Result<(), ErrorKind>;

/// Vectorised implementation of an operation, one variant per arity.
///
/// The kernel receives operands already unified to the representative type
/// and writes into a result allocated with the operand length.
#[derive(Clone, Copy)]
pub enum NativeKernel {
    Unary(UnaryKernel),
    Binary(BinaryKernel),
    Ternary(TernaryKernel),
    Compare(CompareKernel),
}

impl NativeKernel {
    pub fn arity(&self) -> usize {
        match self {
            NativeKernel::Unary(_) => 1,
            NativeKernel::Binary(_) | NativeKernel::Compare(_) => 2,
            NativeKernel::Ternary(_) => 3,
        }
    }
}

impl fmt::Debug for NativeKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeKernel({})", self.arity())
    }
}

/// Classification of one operation for one type.
#[derive(Debug, Clone, Copy, Default)]
pub enum OpEntry {
    Native(NativeKernel),
    /// Evaluate position by position through the element-level counterpart.
    #[default]
    Default,
    /// The type does not support the operation.
    NotImplemented,
}

/// Type traits that restrict which operations make sense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeFlags {
    pub is_matrix: bool,
    pub is_complex: bool,
    pub is_quaternion: bool,
    pub is_pointer: bool,
}

impl TypeFlags {
    /// `true` when `<`, `<=`, `>` and `>=` are meaningless for the type.
    #[inline]
    pub fn forbids_ordering(&self) -> bool {
        self.is_matrix || self.is_complex || self.is_quaternion || self.is_pointer
    }
}

pub type ItemFn = fn(&Array, usize) -> Option<Value>;
pub type SetItemFn = fn(&mut Array, usize, Value) -> Result<(), Value>;
pub type LenFn = fn(&Array) -> usize;

fn default_item(array: &Array, index: usize) -> Option<Value> {
    array.data().get(index)
}

fn default_set_item(array: &mut Array, index: usize, value: Value) -> Result<(), Value> {
    array.data_mut().set(index, value)
}

fn default_len(array: &Array) -> usize {
    array.len()
}

/// # ArrayDescriptor
///
/// Capability record for one array type.
///
/// ## Example
/// ```rust
/// use minapply::{ArrayDescriptor, OpEntry, OpId, Registry, ScalarKind, ShapeDim};
///
/// let mut reg = Registry::new();
/// let key = reg
///     .register(
///         ArrayDescriptor::flat("Float32X", ScalarKind::Float32, ShapeDim::Dynamic)
///             .with_op(OpId::Invert, OpEntry::NotImplemented),
///     )
///     .unwrap();
/// assert_eq!(reg.descriptor(key).unwrap().name(), "Float32X");
/// ```
#[derive(Debug, Clone)]
pub struct ArrayDescriptor {
    pub(crate) name: Arc<str>,
    pub(crate) key: TypeKey,
    pub(crate) layout: Layout,
    pub(crate) shape: ShapeDim,
    pub(crate) ndim: usize,
    pub(crate) mask: Option<TypeKey>,
    pub(crate) ops: [OpEntry; OpId::COUNT],
    pub(crate) flags: TypeFlags,
    pub(crate) item: ItemFn,
    pub(crate) set_item: SetItemFn,
    pub(crate) len: LenFn,
}

impl ArrayDescriptor {
    fn new(name: &str, layout: Layout, shape: ShapeDim) -> Self {
        ArrayDescriptor {
            name: Arc::from(name),
            key: TypeKey(u32::MAX),
            layout,
            shape,
            ndim: 1,
            mask: None,
            ops: [OpEntry::Default; OpId::COUNT],
            flags: TypeFlags::default(),
            item: default_item,
            set_item: default_set_item,
            len: default_len,
        }
    }

    /// Array whose elements are scalars of `kind`.
    pub fn flat(name: &str, kind: ScalarKind, shape: ShapeDim) -> Self {
        ArrayDescriptor::new(name, Layout::Flat(kind), shape)
    }

    /// Array whose elements are instances of `element`.
    pub fn nested(name: &str, element: TypeKey, shape: ShapeDim) -> Self {
        ArrayDescriptor::new(name, Layout::Nested(element), shape)
    }

    /// Shaped view over instances of the flat type `array`.
    pub fn tensor(name: &str, array: TypeKey) -> Self {
        ArrayDescriptor::new(name, Layout::Tensor(array), ShapeDim::Dynamic)
    }

    /// Mask type produced by comparisons and consumed by `select`.
    ///
    /// Without one, the type is its own mask.
    pub fn with_mask(mut self, mask: TypeKey) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_op(mut self, op: OpId, entry: OpEntry) -> Self {
        self.ops[op.index()] = entry;
        self
    }

    pub fn with_ops(mut self, ops: &[OpId], entry: OpEntry) -> Self {
        for op in ops {
            self.ops[op.index()] = entry;
        }
        self
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replaces the element accessors.
    pub fn with_accessors(mut self, item: ItemFn, set_item: SetItemFn, len: LenFn) -> Self {
        self.item = item;
        self.set_item = set_item;
        self.len = len;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn shape(&self) -> ShapeDim {
        self.shape
    }

    /// Nesting depth: 1 for flat arrays, one more per nested level.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub fn is_tensor(&self) -> bool {
        matches!(self.layout, Layout::Tensor(_))
    }

    #[inline]
    pub fn mask_type(&self) -> TypeKey {
        self.mask.unwrap_or(self.key)
    }

    #[inline]
    pub fn op(&self, op: OpId) -> OpEntry {
        self.ops[op.index()]
    }

    #[inline]
    pub fn item(&self, array: &Array, index: usize) -> Option<Value> {
        (self.item)(array, index)
    }

    #[inline]
    pub fn set_item(&self, array: &mut Array, index: usize, value: Value) -> Result<(), Value> {
        (self.set_item)(array, index, value)
    }

    /// Top-level length of `array`, using the static extent when there is one.
    #[inline]
    pub fn len_of(&self, array: &Array) -> usize {
        match self.shape {
            ShapeDim::Fixed(n) => n,
            ShapeDim::Dynamic => (self.len)(array),
        }
    }

    /// Result storage of `len` elements for a kernel or the generic loop to fill.
    ///
    /// Nested slots start out as placeholders that must all be overwritten.
    pub fn alloc(&self, reg: &Registry, len: usize) -> Result<UninitArray, DispatchError> {
        let data = match self.layout {
            Layout::Flat(kind) => ArrayData::zeros(kind, len),
            Layout::Nested(element) => {
                let kind = reg.leaf_kind(element)?;
                ArrayData::Nested(vec![Value::Scalar(kind.zero()); len])
            }
            Layout::Tensor(array) => ArrayData::Tensor {
                array: Arc::new(reg.descriptor(array)?.alloc(reg, len)?.mark_ready()),
                shape: vec![len],
            },
        };
        Ok(UninitArray::new(Array::new(self.key, data)))
    }

    /// Zero-initialised instance of `len` elements.
    pub fn alloc_zero(&self, reg: &Registry, len: usize) -> Result<Array, DispatchError> {
        let data = match self.layout {
            Layout::Flat(kind) => ArrayData::zeros(kind, len),
            Layout::Nested(element) => {
                let desc = reg.descriptor(element)?;
                let inner_len = desc.shape.fixed().unwrap_or(0);
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Value::from(desc.alloc_zero(reg, inner_len)?));
                }
                ArrayData::Nested(items)
            }
            Layout::Tensor(_) => return self.alloc_tensor(reg, &[len]),
        };
        Ok(Array::new(self.key, data))
    }

    /// Zero-initialised tensor of the given shape.
    pub fn alloc_tensor(&self, reg: &Registry, shape: &[usize]) -> Result<Array, DispatchError> {
        let Layout::Tensor(array) = self.layout else {
            return Err(ErrorKind::NotATensor(self.name.to_string()).into());
        };
        let size = shape.iter().product();
        let flat = reg.descriptor(array)?.alloc_zero(reg, size)?;
        Ok(Array::new(
            self.key,
            ArrayData::Tensor { array: Arc::new(flat), shape: shape.to_vec() },
        ))
    }

    /// Resizes a dynamic instance in place, zero-filling new elements.
    pub fn init(&self, reg: &Registry, array: &mut Array, len: usize) -> Result<(), DispatchError> {
        if self.shape.fixed().is_some() {
            return Ok(());
        }
        match self.layout {
            Layout::Flat(_) => array.data_mut().resize_flat(len),
            Layout::Nested(_) | Layout::Tensor(_) => *array = self.alloc_zero(reg, len)?,
        }
        Ok(())
    }

    /// Flat backing array of a tensor instance.
    pub fn tensor_array<'a>(&self, array: &'a Array) -> Result<&'a Arc<Array>, ErrorKind> {
        array
            .tensor_parts()
            .map(|(flat, _)| flat)
            .ok_or_else(|| ErrorKind::NotATensor(self.name.to_string()))
    }

    /// Shape of a tensor instance.
    pub fn tensor_shape<'a>(&self, array: &'a Array) -> Result<&'a [usize], ErrorKind> {
        array
            .tensor_parts()
            .map(|(_, shape)| shape)
            .ok_or_else(|| ErrorKind::NotATensor(self.name.to_string()))
    }
}
