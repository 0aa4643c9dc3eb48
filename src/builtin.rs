// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Builtin Types Module
//!
//! Stock array types for applications and tests that do not bring their own.
//!
//! ## Types
//! | Key | Layout | Extent | Mask |
//! |---|---|---|---|
//! | [`BOOLX`] | flat `bool` | dynamic | itself |
//! | [`INT32X`], [`INT64X`], [`UINT32X`] | flat integers | dynamic | [`BOOLX`] |
//! | [`FLOAT32X`], [`FLOAT64X`] | flat floats | dynamic | [`BOOLX`] |
//! | [`ARRAY3B`], [`ARRAY3F`] | flat | 3 | [`ARRAY3B`] |
//! | [`ARRAY3BX`], [`ARRAY3FX`] | nested over `BoolX` / `Float32X` | 3 | [`ARRAY3BX`] |
//! | [`TENSORXB`], [`TENSORXI`], [`TENSORXF`] | tensors | dynamic | [`TENSORXB`] |
//! | [`COMPLEX2F`] | flat `f32` pair, complex | 2 | [`BOOLX`] |
//!
//! Float arrays carry native kernels for `neg`, `abs`, `sqrt`, `add`, `sub`,
//! `mul`, `minimum`, `maximum`, `fma` and comparisons; `BoolX` carries native
//! `and`, `or` and `xor` and reports arithmetic as not implemented. Everything
//! else runs through the generic element loop.

use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::operators::OpId;
use crate::enums::scalar::ScalarKind;
use crate::enums::shape_dim::ShapeDim;
use crate::kernels::native;
use crate::structs::array::{Array, ArrayData, UninitArray};
use crate::structs::descriptor::{ArrayDescriptor, NativeKernel, OpEntry, TypeFlags, TypeKey};
use crate::structs::registry::Registry;

pub const BOOLX: TypeKey = TypeKey::from_index(0);
pub const INT32X: TypeKey = TypeKey::from_index(1);
pub const INT64X: TypeKey = TypeKey::from_index(2);
pub const UINT32X: TypeKey = TypeKey::from_index(3);
pub const FLOAT32X: TypeKey = TypeKey::from_index(4);
pub const FLOAT64X: TypeKey = TypeKey::from_index(5);
pub const ARRAY3B: TypeKey = TypeKey::from_index(6);
pub const ARRAY3F: TypeKey = TypeKey::from_index(7);
pub const ARRAY3BX: TypeKey = TypeKey::from_index(8);
pub const ARRAY3FX: TypeKey = TypeKey::from_index(9);
pub const TENSORXB: TypeKey = TypeKey::from_index(10);
pub const TENSORXI: TypeKey = TypeKey::from_index(11);
pub const TENSORXF: TypeKey = TypeKey::from_index(12);
pub const COMPLEX2F: TypeKey = TypeKey::from_index(13);

/// Operations that make no sense on masks.
const BOOL_UNSUPPORTED: &[OpId] = &[
    OpId::Neg,
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
    OpId::Atan2,
    OpId::Fma,
];

/// Registry holding the stock types under the keys above.
///
/// # Example
/// ```rust
/// use minapply::builtin;
///
/// let reg = builtin::registry().unwrap();
/// assert_eq!(reg.key("Float32X"), Some(builtin::FLOAT32X));
/// ```
pub fn registry() -> Result<Registry, DispatchError> {
    let mut reg = Registry::new();
    let flat = |name: &str, kind: ScalarKind| ArrayDescriptor::flat(name, kind, ShapeDim::Dynamic);

    let bools = flat("BoolX", ScalarKind::Boolean)
        .with_ops(BOOL_UNSUPPORTED, OpEntry::NotImplemented)
        .with_op(OpId::And, native_binary(native::and))
        .with_op(OpId::Or, native_binary(native::or))
        .with_op(OpId::Xor, native_binary(native::xor));
    add(&mut reg, BOOLX, bools)?;
    add(&mut reg, INT32X, flat("Int32X", ScalarKind::Int32).with_mask(BOOLX))?;
    add(&mut reg, INT64X, flat("Int64X", ScalarKind::Int64).with_mask(BOOLX))?;
    add(&mut reg, UINT32X, flat("UInt32X", ScalarKind::UInt32).with_mask(BOOLX))?;
    add(&mut reg, FLOAT32X, float_kernels(flat("Float32X", ScalarKind::Float32).with_mask(BOOLX)))?;
    add(&mut reg, FLOAT64X, float_kernels(flat("Float64X", ScalarKind::Float64).with_mask(BOOLX)))?;

    add(&mut reg, ARRAY3B, ArrayDescriptor::flat("Array3b", ScalarKind::Boolean, ShapeDim::Fixed(3)))?;
    add(
        &mut reg,
        ARRAY3F,
        ArrayDescriptor::flat("Array3f", ScalarKind::Float32, ShapeDim::Fixed(3)).with_mask(ARRAY3B),
    )?;
    add(&mut reg, ARRAY3BX, ArrayDescriptor::nested("Array3bX", BOOLX, ShapeDim::Fixed(3)))?;
    add(
        &mut reg,
        ARRAY3FX,
        ArrayDescriptor::nested("Array3fX", FLOAT32X, ShapeDim::Fixed(3)).with_mask(ARRAY3BX),
    )?;

    add(&mut reg, TENSORXB, ArrayDescriptor::tensor("TensorXb", BOOLX))?;
    add(&mut reg, TENSORXI, ArrayDescriptor::tensor("TensorXi", INT32X).with_mask(TENSORXB))?;
    add(&mut reg, TENSORXF, ArrayDescriptor::tensor("TensorXf", FLOAT32X).with_mask(TENSORXB))?;

    let complex = ArrayDescriptor::flat("Complex2f", ScalarKind::Float32, ShapeDim::Fixed(2))
        .with_mask(BOOLX)
        .with_flags(TypeFlags { is_complex: true, ..Default::default() })
        .with_op(OpId::Mul, native_binary(complex_mul));
    add(&mut reg, COMPLEX2F, complex)?;
    Ok(reg)
}

fn add(reg: &mut Registry, expected: TypeKey, desc: ArrayDescriptor) -> Result<(), DispatchError> {
    let name = desc.name().to_string();
    let key = reg.register(desc)?;
    if key != expected {
        return Err(ErrorKind::TypeError(format!(
            "'{}' registered as {} instead of {}",
            name, key, expected
        ))
        .into());
    }
    Ok(())
}

fn native_binary(k: fn(&Array, &Array, &mut UninitArray) -> Result<(), ErrorKind>) -> OpEntry {
    OpEntry::Native(NativeKernel::Binary(k))
}

fn float_kernels(desc: ArrayDescriptor) -> ArrayDescriptor {
    desc.with_op(OpId::Neg, OpEntry::Native(NativeKernel::Unary(native::neg)))
        .with_op(OpId::Abs, OpEntry::Native(NativeKernel::Unary(native::abs)))
        .with_op(OpId::Sqrt, OpEntry::Native(NativeKernel::Unary(native::sqrt)))
        .with_op(OpId::Add, native_binary(native::add))
        .with_op(OpId::Sub, native_binary(native::sub))
        .with_op(OpId::Mul, native_binary(native::mul))
        .with_op(OpId::Minimum, native_binary(native::minimum))
        .with_op(OpId::Maximum, native_binary(native::maximum))
        .with_op(OpId::Fma, OpEntry::Native(NativeKernel::Ternary(native::fma)))
        .with_op(OpId::RichCompare, OpEntry::Native(NativeKernel::Compare(native::compare)))
}

/// `(a + bi)(c + di)` on `[re, im]` pairs.
fn complex_mul(a: &Array, b: &Array, out: &mut UninitArray) -> Result<(), ErrorKind> {
    match (a.as_f32(), b.as_f32()) {
        (Some(&[ar, ai]), Some(&[br, bi])) => {
            *out.data_mut() = ArrayData::from(vec![ar * br - ai * bi, ar * bi + ai * br]);
            Ok(())
        }
        _ => Err(ErrorKind::Kernel(format!(
            "complex multiplication needs two [re, im] pairs, got lengths {} and {}",
            a.len(),
            b.len()
        ))),
    }
}
