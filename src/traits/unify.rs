// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Unify Module
//!
//! Rewrites operands of mismatched types to one common representation before
//! dispatch.
//!
//! [`TypeUnifier`] is the seam; [`PromoteUnifier`] is the stock promotion
//! policy installed in every new [`Registry`].

use tracing::debug;

use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::operators::ApplyMode;
use crate::enums::scalar::{Scalar, ScalarKind};
use crate::enums::shape_dim::ShapeDim;
use crate::enums::value::Value;
use crate::structs::array::{Array, ArrayData};
use crate::structs::descriptor::{ArrayDescriptor, Layout, TypeKey};
use crate::structs::registry::Registry;

/// Brings operands of differing types to a common type.
///
/// Called by the dispatcher only when the operand type tags are not all equal.
/// On success the representative operand (operand 1 under `Select`, otherwise
/// operand 0) determines the type of the operation.
pub trait TypeUnifier: Send + Sync {
    fn unify(
        &self,
        reg: &Registry,
        mode: ApplyMode,
        operands: &mut [Value],
    ) -> Result<(), DispatchError>;
}

/// # PromoteUnifier
///
/// Promotes every value operand to the highest ranked array type among them.
///
/// ## Ranking
/// Tensors outrank plain arrays, deeper nesting outranks shallower, and a
/// higher element kind outranks a lower one. On a tie the earliest operand wins.
///
/// ## Conversions
/// - Scalars are lifted: `n` copies for a fixed extent `n`, a single element
/// for dynamic arrays, a rank-0 tensor for tensors.
/// - Arrays of the same depth are converted element by element. A fixed
/// target accepts a source of length `n` or 1.
/// - Shallower arrays are broadcast into every element of a deeper target.
/// - Plain arrays become rank-1 tensors.
/// - Under `Select` the mask operand is converted to the target's mask type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromoteUnifier;

impl TypeUnifier for PromoteUnifier {
    fn unify(
        &self,
        reg: &Registry,
        mode: ApplyMode,
        operands: &mut [Value],
    ) -> Result<(), DispatchError> {
        let first = mode.representative();
        let mut target: Option<(&ArrayDescriptor, (bool, usize, ScalarKind))> = None;
        for value in operands.iter().skip(first) {
            let Value::Array(a) = value else { continue };
            let desc = reg.descriptor(a.type_key())?;
            let rank = (desc.is_tensor(), desc.ndim(), reg.leaf_kind(desc.key())?);
            if target.is_none_or(|(_, best)| rank > best) {
                target = Some((desc, rank));
            }
        }
        let Some((target, _)) = target else {
            let from = operands.get(first).map(|v| reg.type_name(v)).unwrap_or_default();
            return Err(ErrorKind::Unification { from, to: "array".to_string() }.into());
        };

        debug!(target = target.name(), ?mode, "promoting operands");
        let key = target.key();
        for value in operands.iter_mut().skip(first) {
            convert_in_place(reg, value, key)?;
        }
        if mode == ApplyMode::Select {
            if let Some(mask) = operands.first_mut() {
                convert_in_place(reg, mask, target.mask_type())?;
            }
        }
        Ok(())
    }
}

fn convert_in_place(reg: &Registry, value: &mut Value, to: TypeKey) -> Result<(), DispatchError> {
    if value.type_key() != Some(to) {
        *value = convert(reg, value, to)?;
    }
    Ok(())
}

/// Converts `value` to an instance of `to` following the [`PromoteUnifier`] rules.
pub fn convert(reg: &Registry, value: &Value, to: TypeKey) -> Result<Value, DispatchError> {
    let target = reg.descriptor(to)?;
    let source = match value {
        Value::Scalar(s) => return lift(reg, *s, target),
        Value::Array(a) if a.type_key() == to => return Ok(value.clone()),
        Value::Array(a) => a,
    };
    let src_desc = reg.descriptor(source.type_key())?;
    let mismatch = || -> DispatchError {
        ErrorKind::Unification {
            from: src_desc.name().to_string(),
            to: target.name().to_string(),
        }
        .into()
    };

    match (src_desc.layout(), target.layout()) {
        (Layout::Tensor(_), Layout::Tensor(flat)) => {
            let (array, shape) = source.tensor_parts().ok_or_else(mismatch)?;
            let array = convert(reg, &Value::Array(array.clone()), flat)?;
            wrap_tensor(to, array, shape.to_vec())
        }
        (Layout::Tensor(_), _) => Err(mismatch()),
        (_, Layout::Tensor(flat)) if src_desc.ndim() == 1 => {
            let len = src_desc.len_of(source);
            let array = convert(reg, value, flat)?;
            wrap_tensor(to, array, vec![len])
        }
        (_, Layout::Tensor(_)) => Err(mismatch()),
        _ if src_desc.ndim() == target.ndim() => {
            let len = src_desc.len_of(source);
            let out_len = match target.shape() {
                ShapeDim::Fixed(n) if len == n || len == 1 => n,
                ShapeDim::Fixed(n) => {
                    return Err(ErrorKind::SizeIncompatible { sizes: vec![len, n] }.into());
                }
                ShapeDim::Dynamic => len,
            };
            let mut out = target.alloc(reg, out_len)?;
            let elem_key = match target.layout() {
                Layout::Nested(elem) => Some(elem),
                _ => None,
            };
            for i in 0..out_len {
                let j = if len == 1 { 0 } else { i };
                let item = src_desc
                    .item(source, j)
                    .ok_or(ErrorKind::ItemAccess { index: j })?;
                let item = match elem_key {
                    Some(elem) => convert(reg, &item, elem)?,
                    None => item,
                };
                target.set_item(out.array_mut(), i, item).map_err(|v| ErrorKind::ItemAssign {
                    index: i,
                    found: reg.type_name(&v),
                })?;
            }
            Ok(Value::from(out.mark_ready()))
        }
        (_, Layout::Nested(elem)) if src_desc.ndim() < target.ndim() => {
            let item = convert(reg, value, elem)?;
            fill(reg, target, item)
        }
        _ => Err(mismatch()),
    }
}

/// Lifts a scalar into `target`.
fn lift(reg: &Registry, s: Scalar, target: &ArrayDescriptor) -> Result<Value, DispatchError> {
    match target.layout() {
        Layout::Flat(kind) => fill(reg, target, Value::Scalar(s.cast(kind))),
        Layout::Nested(elem) => {
            let item = lift(reg, s, reg.descriptor(elem)?)?;
            fill(reg, target, item)
        }
        Layout::Tensor(flat) => {
            let array = lift(reg, s, reg.descriptor(flat)?)?;
            wrap_tensor(target.key(), array, Vec::new())
        }
    }
}

/// Instance of `target` whose every element is `item`.
fn fill(reg: &Registry, target: &ArrayDescriptor, item: Value) -> Result<Value, DispatchError> {
    let n = target.shape().fixed().unwrap_or(1);
    let mut out = target.alloc(reg, n)?;
    for i in 0..n {
        target
            .set_item(out.array_mut(), i, item.clone())
            .map_err(|v| ErrorKind::ItemAssign { index: i, found: reg.type_name(&v) })?;
    }
    Ok(Value::from(out.mark_ready()))
}

fn wrap_tensor(key: TypeKey, array: Value, shape: Vec<usize>) -> Result<Value, DispatchError> {
    match array {
        Value::Array(array) => {
            Ok(Value::from(Array::new(key, ArrayData::Tensor { array, shape })))
        }
        Value::Scalar(s) => Err(ErrorKind::TypeError(format!(
            "expected an array to back a tensor, found {}",
            s.kind()
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (Registry, TypeKey, TypeKey, TypeKey, TypeKey) {
        let mut reg = Registry::new();
        let i = reg
            .register(ArrayDescriptor::flat("I", ScalarKind::Int32, ShapeDim::Dynamic))
            .unwrap();
        let f = reg
            .register(ArrayDescriptor::flat("F", ScalarKind::Float32, ShapeDim::Dynamic))
            .unwrap();
        let v3 = reg.register(ArrayDescriptor::nested("V3", f, ShapeDim::Fixed(3))).unwrap();
        let t = reg.register(ArrayDescriptor::tensor("T", f)).unwrap();
        (reg, i, f, v3, t)
    }

    #[test]
    fn test_scalar_lifts_to_single_element() {
        let (reg, _, f, _, _) = registry();
        let mut ops = vec![reg.array(f, vec![1.0f32, 2.0]).unwrap(), Value::from(3i32)];
        PromoteUnifier.unify(&reg, ApplyMode::Normal, &mut ops).unwrap();
        assert_eq!(ops[1], reg.array(f, vec![3.0f32]).unwrap());
    }

    #[test]
    fn test_higher_kind_wins() {
        let (reg, i, f, _, _) = registry();
        let mut ops = vec![reg.array(i, vec![1i32, 2]).unwrap(), reg.array(f, vec![0.5f32]).unwrap()];
        PromoteUnifier.unify(&reg, ApplyMode::Normal, &mut ops).unwrap();
        assert_eq!(ops[0], reg.array(f, vec![1.0f32, 2.0]).unwrap());
    }

    #[test]
    fn test_shallow_array_broadcasts_into_nested() {
        let (reg, _, f, v3, _) = registry();
        let x = reg.array(f, vec![1.0f32, 2.0]).unwrap();
        let nested = reg.array(v3, vec![x.clone(), x.clone(), x.clone()]).unwrap();
        let mut ops = vec![x.clone(), nested];
        PromoteUnifier.unify(&reg, ApplyMode::Normal, &mut ops).unwrap();
        assert_eq!(ops[0].type_key(), Some(v3));
        assert_eq!(ops[0].as_array().unwrap().items().unwrap()[2], x);
    }

    #[test]
    fn test_flat_array_becomes_rank_one_tensor() {
        let (reg, _, f, _, t) = registry();
        let tensor = reg.tensor(t, vec![1.0f32, 2.0], &[2]).unwrap();
        let mut ops = vec![reg.array(f, vec![5.0f32, 6.0, 7.0]).unwrap(), tensor];
        PromoteUnifier.unify(&reg, ApplyMode::Normal, &mut ops).unwrap();
        let (_, shape) = ops[0].as_array().unwrap().tensor_parts().unwrap();
        assert_eq!(shape, &[3]);
    }

    #[test]
    fn test_scalar_becomes_rank_zero_tensor() {
        let (reg, _, _, _, t) = registry();
        let tensor = reg.tensor(t, vec![1.0f32, 2.0], &[2]).unwrap();
        let mut ops = vec![tensor, Value::from(1.0f64)];
        PromoteUnifier.unify(&reg, ApplyMode::Normal, &mut ops).unwrap();
        let (flat, shape) = ops[1].as_array().unwrap().tensor_parts().unwrap();
        assert!(shape.is_empty());
        assert_eq!(flat.as_f32(), Some(&[1.0f32][..]));
    }

    #[test]
    fn test_fixed_target_rejects_wrong_length() {
        let (mut reg, _, f, _, _) = registry();
        let a3 = reg
            .register(ArrayDescriptor::flat("A3", ScalarKind::Float64, ShapeDim::Fixed(3)))
            .unwrap();
        let err = convert(&reg, &reg.array(f, vec![1.0f32, 2.0]).unwrap(), a3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SizeIncompatible { .. }));
    }

    #[test]
    fn test_tensor_to_plain_is_refused() {
        let (reg, _, f, _, t) = registry();
        let tensor = reg.tensor(t, vec![1.0f32], &[1]).unwrap();
        let err = convert(&reg, &tensor, f).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Unification { .. }));
    }
}
