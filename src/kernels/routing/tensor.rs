// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Tensor Module
//!
//! Shape reconciliation layer above [`apply`].
//!
//! A tensor operation reads every operand's flat array and shape, agrees on a
//! target shape, gathers each mismatched operand up to that shape, runs the
//! operation on the flat arrays, and wraps the flat result back into a tensor.

use tracing::debug;

use crate::aliases::Operands;
use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::operators::{ApplyMode, OpId, Slot};
use crate::enums::value::Value;
use crate::kernels::routing::apply::{Applied, apply, finish, rep_name, unified, with_frame};
use crate::kernels::routing::broadcast::{reconcile_shapes, tensor_broadcast};
use crate::structs::array::{Array, ArrayData};
use crate::structs::registry::Registry;

/// Applies `op` to tensor operands.
///
/// Behaves like [`apply`] but insists that the operands unify to a tensor type.
pub fn apply_tensor(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    let rep = mode.representative();
    if operands.is_empty() || operands.len() > 3 || rep >= operands.len() {
        return Err(ErrorKind::Arity { op: op.name(), expected: op.arity(), found: operands.len() }.into());
    }
    let (local, rep_key) = unified(reg, mode, op, slot, operands)?;
    dispatch_tensor(reg, mode, op, slot, local, operands)
        .map_err(|e| with_frame(op, slot, rep_name(reg, rep_key, &operands[rep]), e))
}

/// Tensor path shared with [`apply`]; `local` holds the unified operands.
pub(crate) fn dispatch_tensor(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    local: Operands,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    let movable = mode == ApplyMode::InPlace && local[0].ptr_eq(&operands[0]);
    let rep_key = local[mode.representative()]
        .type_key()
        .ok_or_else(|| ErrorKind::NotATensor(reg.type_name(&local[mode.representative()])))?;
    let rep_desc = reg.descriptor(rep_key)?;
    if !rep_desc.is_tensor() {
        return Err(ErrorKind::NotATensor(rep_desc.name().to_string()).into());
    }

    let mut arrays: Operands = Operands::new();
    let mut shapes: Vec<Vec<usize>> = Vec::with_capacity(local.len());
    for value in &local {
        let array = value
            .as_array()
            .ok_or_else(|| ErrorKind::NotATensor(reg.type_name(value)))?;
        let desc = reg.descriptor(array.type_key())?;
        arrays.push(Value::Array(desc.tensor_array(array)?.clone()));
        shapes.push(desc.tensor_shape(array)?.to_vec());
    }
    drop(local);

    let shape = if shapes.len() > 1 {
        let shape = reconcile_shapes(&shapes)?;
        for (array, src) in arrays.iter_mut().zip(&shapes) {
            if let Value::Array(flat) = array {
                if !src.is_empty() && *src != shape {
                    debug!(from = ?src, to = ?shape, "broadcasting tensor operand");
                    *flat = tensor_broadcast(flat, src, &shape)?;
                }
            }
        }
        shape
    } else {
        shapes.swap_remove(0)
    };

    let flat = match apply(reg, mode.nested(), op, slot, &mut arrays)? {
        Applied::NotImplemented => return Ok(Applied::NotImplemented),
        Applied::Value(Value::Array(flat)) => flat,
        Applied::Value(Value::Scalar(s)) => {
            return Err(ErrorKind::TypeError(format!(
                "tensor operation produced scalar {}",
                s
            ))
            .into());
        }
    };
    drop(arrays);

    let res_key = if mode == ApplyMode::RichCompare { rep_desc.mask_type() } else { rep_key };
    let result = Value::from(Array::new(res_key, ArrayData::Tensor { array: flat, shape }));
    Ok(Applied::Value(finish(movable, operands, result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::operators::CompareOp;
    use crate::enums::scalar::ScalarKind;
    use crate::enums::shape_dim::ShapeDim;
    use crate::structs::descriptor::{ArrayDescriptor, TypeKey};

    fn types() -> (Registry, TypeKey, TypeKey, TypeKey) {
        let mut reg = Registry::new();
        let b = reg.register(ArrayDescriptor::flat("B", ScalarKind::Boolean, ShapeDim::Dynamic)).unwrap();
        let f = reg
            .register(ArrayDescriptor::flat("F", ScalarKind::Float64, ShapeDim::Dynamic).with_mask(b))
            .unwrap();
        let tb = reg.register(ArrayDescriptor::tensor("TB", b)).unwrap();
        let tf = reg.register(ArrayDescriptor::tensor("TF", f).with_mask(tb)).unwrap();
        (reg, f, tb, tf)
    }

    fn parts(v: &Value) -> (Vec<f64>, Vec<usize>) {
        let (flat, shape) = v.as_array().unwrap().tensor_parts().unwrap();
        (flat.as_f64().unwrap().to_vec(), shape.to_vec())
    }

    #[test]
    fn test_row_broadcasts_over_matrix() {
        let (reg, _, _, tf) = types();
        let row = reg.tensor(tf, vec![1.0f64, 2.0, 3.0], &[1, 3]).unwrap();
        let m = reg.tensor(tf, vec![10.0f64, 20.0, 30.0, 40.0, 50.0, 60.0], &[2, 3]).unwrap();
        let out = apply_tensor(&reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut [row, m])
            .unwrap()
            .value()
            .unwrap();
        let (data, shape) = parts(&out);
        assert_eq!(shape, [2, 3]);
        assert_eq!(data, [11.0, 22.0, 33.0, 41.0, 52.0, 63.0]);
    }

    #[test]
    fn test_scalar_joins_as_rank_zero() {
        let (reg, _, _, tf) = types();
        let m = reg.tensor(tf, vec![1.0f64, 2.0], &[2, 1]).unwrap();
        let out = apply(&reg, ApplyMode::Normal, OpId::Mul, Slot::Method, &mut [m, Value::from(3.0f64)])
            .unwrap()
            .value()
            .unwrap();
        assert_eq!(parts(&out), (vec![3.0, 6.0], vec![2, 1]));
    }

    #[test]
    fn test_incompatible_shapes() {
        let (reg, _, _, tf) = types();
        let a = reg.tensor(tf, vec![0.0f64; 6], &[2, 3]).unwrap();
        let b = reg.tensor(tf, vec![0.0f64; 12], &[4, 3]).unwrap();
        let err = apply_tensor(&reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut [a, b]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ShapeIncompatible { .. }));
        assert_eq!(
            err.to_string(),
            "TF.add(): Operands have incompatible shapes: [2, 3] and [4, 3]."
        );
    }

    #[test]
    fn test_compare_produces_mask_tensor() {
        let (reg, _, tb, tf) = types();
        let a = reg.tensor(tf, vec![1.0f64, 4.0], &[2]).unwrap();
        let out = apply_tensor(
            &reg,
            ApplyMode::RichCompare,
            OpId::RichCompare,
            Slot::Compare(CompareOp::Gt),
            &mut [a, Value::from(2.0f64)],
        )
        .unwrap()
        .value()
        .unwrap();
        let array = out.as_array().unwrap();
        assert_eq!(array.type_key(), tb);
        let (flat, shape) = array.tensor_parts().unwrap();
        assert_eq!(flat.as_bool(), Some(&[false, true][..]));
        assert_eq!(shape, [2]);
    }

    #[test]
    fn test_in_place_replaces_operand() {
        let (reg, _, _, tf) = types();
        let a = reg.tensor(tf, vec![1.0f64, 2.0], &[2]).unwrap();
        let mut ops = [a, Value::from(1.0f64)];
        let out = apply_tensor(&reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops)
            .unwrap()
            .value()
            .unwrap();
        assert!(out.ptr_eq(&ops[0]));
        assert_eq!(parts(&ops[0]).0, [2.0, 3.0]);
    }

    #[test]
    fn test_plain_array_is_not_a_tensor() {
        let (reg, f, _, _) = types();
        let a = reg.array(f, vec![1.0f64]).unwrap();
        let err = apply_tensor(&reg, ApplyMode::Normal, OpId::Neg, Slot::Method, &mut [a]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NotATensor("F".into()));
    }

    #[test]
    fn test_frame_names_unified_tensor_type() {
        let (reg, f, _, tf) = types();
        let a = reg.array(f, vec![1.0f64, 2.0, 3.0]).unwrap();
        let t = reg.tensor(tf, vec![1.0f64, 2.0], &[2]).unwrap();
        let err = apply_tensor(&reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut [a, t]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ShapeIncompatible { .. }));
        assert!(err.to_string().starts_with("TF.add(): "), "{err}");
    }

    #[test]
    fn test_in_place_with_operand_aliased() {
        let (reg, _, _, tf) = types();
        let a = reg.tensor(tf, vec![1.0f64, 2.0], &[2]).unwrap();
        let handle = a.as_array().unwrap().as_ref() as *const Array;
        let mut ops = [a.clone(), a];
        apply_tensor(&reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops).unwrap();
        assert_eq!(ops[0].as_array().unwrap().as_ref() as *const Array, handle);
        assert!(ops[1].ptr_eq(&ops[0]));
        assert_eq!(parts(&ops[0]), (vec![2.0, 4.0], vec![2]));
    }
}
