// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Apply Module
//!
//! The operation dispatcher.
//!
//! [`apply`] resolves an operation on one to three operands against a single
//! representative type. Depending on the type's operation table it calls a
//! native kernel, reports the operation as unsupported, or evaluates it
//! position by position through the element-level counterpart, broadcasting
//! length-1 operands along the way. Tensors are handed to
//! [`crate::kernels::routing::tensor`].

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use crate::aliases::{Operands, Sizes};
use crate::enums::error::{DispatchError, ErrorKind, Frame};
use crate::enums::operators::{ApplyMode, OpId, Slot};
use crate::enums::scalar::Scalar;
use crate::enums::value::Value;
use crate::kernels::routing::broadcast::reconcile_lengths;
use crate::kernels::routing::tensor::dispatch_tensor;
use crate::kernels::scalar;
use crate::structs::array::{Array, UninitArray};
use crate::structs::descriptor::{ArrayDescriptor, NativeKernel, OpEntry, TypeKey};
use crate::structs::registry::{ElementFn, Registry};

/// Outcome of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Value(Value),
    /// The representative type marks the operation as unsupported. Operands
    /// are left untouched so the caller can try another route.
    NotImplemented,
}

impl Applied {
    /// The result, or `None` when the operation is unsupported.
    pub fn value(self) -> Option<Value> {
        match self {
            Applied::Value(v) => Some(v),
            Applied::NotImplemented => None,
        }
    }

    #[inline]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Applied::NotImplemented)
    }
}

/// Applies `op` to `operands`.
///
/// - `mode` picks the result type and whether operand 0 is updated in place.
/// - `slot` selects the element-level counterpart used by the generic loop.
///
/// Under [`ApplyMode::InPlace`] the result is also stored in `operands[0]`,
/// reusing its storage when its length already matches the result, and the
/// returned value shares identity with `operands[0]`. An operand 0 that had
/// to be converted to the common type is left as it was.
///
/// Failures carry a frame naming the representative type and the operation.
///
/// # Example
/// ```rust
/// # #[cfg(feature = "builtin_types")] {
/// use minapply::{apply, builtin, ApplyMode, OpId, Slot};
///
/// let reg = builtin::registry().unwrap();
/// let a = reg.array(builtin::FLOAT32X, vec![2.0f32]).unwrap();
/// let b = reg.array(builtin::FLOAT32X, vec![1.0f32, 2.0, 3.0]).unwrap();
/// let out = apply(&reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut [a, b])
///     .unwrap()
///     .value()
///     .unwrap();
/// assert_eq!(out, reg.array(builtin::FLOAT32X, vec![3.0f32, 4.0, 5.0]).unwrap());
/// # }
/// ```
pub fn apply(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    let n = operands.len();
    let expected = match mode {
        ApplyMode::Select => Some(3),
        ApplyMode::RichCompare => Some(2),
        _ => None,
    };
    if !(1..=3).contains(&n) || expected.is_some_and(|e| e != n) {
        let expected = expected.unwrap_or(op.arity());
        return Err(ErrorKind::Arity { op: op.name(), expected, found: n }.into());
    }

    if let Some(scalars) = all_scalars(operands) {
        let out = Value::Scalar(scalar::eval(op, slot, &scalars)?);
        if mode == ApplyMode::InPlace {
            operands[0] = out.clone();
        }
        return Ok(Applied::Value(out));
    }

    dispatch(reg, mode, op, slot, operands)
}

/// Annotates `e` with the dispatch frame of `op` on the type named `type_name`.
pub(crate) fn with_frame(op: OpId, slot: Slot, type_name: String, e: DispatchError) -> DispatchError {
    match slot {
        Slot::Function(name) => e.within(Frame::Function { name, type_name }),
        _ => e.within(Frame::Method { type_name, op: op.name() }),
    }
}

/// Copies `operands` and unifies them when their types differ.
///
/// Returns the unified operands and the representative type key. A unifier
/// failure is framed with the caller's representative operand, as no common
/// type exists yet.
pub(crate) fn unified(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    operands: &[Value],
) -> Result<(Operands, Option<TypeKey>), DispatchError> {
    let rep = mode.representative();
    let mut local: Operands = operands.iter().cloned().collect();
    if local.windows(2).any(|w| w[0].type_tag() != w[1].type_tag()) {
        reg.unifier()
            .unify(reg, mode, &mut local)
            .map_err(|e| with_frame(op, slot, reg.type_name(&operands[rep]), e))?;
    }
    let rep_key = local[rep].type_key();
    Ok((local, rep_key))
}

/// Name of the unified representative type, or of `fallback` when it is not an array.
pub(crate) fn rep_name(reg: &Registry, rep_key: Option<TypeKey>, fallback: &Value) -> String {
    match rep_key.and_then(|key| reg.descriptor(key).ok()) {
        Some(desc) => desc.name().to_string(),
        None => reg.type_name(fallback),
    }
}

/// Evaluates `op` on one position's elements.
///
/// Scalars are evaluated directly; anything else recurses through [`apply`].
/// An unsupported nested operation is a hard error at this level.
pub fn call_element(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    args: &[Value],
) -> Result<Value, DispatchError> {
    let mut operands: Operands = args.iter().cloned().collect();
    match apply(reg, mode, op, slot, &mut operands)? {
        Applied::Value(v) => Ok(v),
        Applied::NotImplemented => {
            let names: Vec<String> = args.iter().map(|v| reg.type_name(v)).collect();
            Err(ErrorKind::NestedOperation { op: op.name(), operands: names.join(", ") }.into())
        }
    }
}

fn all_scalars(operands: &[Value]) -> Option<SmallVec<[Scalar; 3]>> {
    operands.iter().map(Value::as_scalar).collect()
}

fn dispatch(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    let (local, rep_key) = unified(reg, mode, op, slot, operands)?;
    resolve(reg, mode, op, slot, local, operands).map_err(|e| {
        with_frame(op, slot, rep_name(reg, rep_key, &operands[mode.representative()]), e)
    })
}

fn resolve(
    reg: &Registry,
    mode: ApplyMode,
    op: OpId,
    slot: Slot,
    local: Operands,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    // Only an operand 0 the unifier left alone may receive the result.
    let movable = mode == ApplyMode::InPlace && local[0].ptr_eq(&operands[0]);

    let rep = mode.representative();
    let key = local[rep]
        .type_key()
        .ok_or_else(|| ErrorKind::TypeError("representative operand is not an array".to_string()))?;
    let desc = reg.descriptor(key)?;

    if desc.is_tensor() {
        trace!(op = op.name(), ty = desc.name(), "delegating to tensor dispatch");
        return dispatch_tensor(reg, mode, op, slot, local, operands);
    }

    if let (OpId::RichCompare, Slot::Compare(cmp)) = (op, slot) {
        if cmp.is_ordering() && desc.flags().forbids_ordering() {
            return Err(ErrorKind::InvalidComparison.into());
        }
    }

    let res_key = if mode == ApplyMode::RichCompare { desc.mask_type() } else { key };
    let res_desc = reg.descriptor(res_key)?;

    match desc.op(op) {
        OpEntry::NotImplemented => {
            trace!(op = op.name(), ty = desc.name(), "operation not implemented");
            Ok(Applied::NotImplemented)
        }
        OpEntry::Native(kernel) => {
            trace!(op = op.name(), ty = desc.name(), "native kernel");
            let arrays = arrays_of(reg, &local)?;
            let mut out = res_desc.alloc(reg, 0)?;
            run_kernel(op, slot, kernel, &arrays, &mut out)?;
            let result = Value::from(out.mark_ready());
            drop(arrays);
            drop(local);
            Ok(Applied::Value(finish(movable, operands, result)))
        }
        OpEntry::Default => {
            let ctx = LoopCtx { reg, op, counterpart: Counterpart::resolve(reg, mode, slot)?, res_desc };
            generic_loop(&ctx, movable, desc, local, operands)
        }
    }
}

/// Element-level counterpart, resolved once per generic loop.
enum Counterpart<'r> {
    Element { mode: ApplyMode, slot: Slot },
    Function(&'r ElementFn),
}

impl<'r> Counterpart<'r> {
    fn resolve(reg: &'r Registry, mode: ApplyMode, slot: Slot) -> Result<Self, DispatchError> {
        Ok(match slot {
            Slot::Method => Counterpart::Element { mode: mode.nested(), slot },
            Slot::Compare(_) => Counterpart::Element { mode: ApplyMode::RichCompare, slot },
            Slot::Function(name) => Counterpart::Function(
                reg.function(name)
                    .ok_or_else(|| ErrorKind::UnknownFunction(name.to_string()))?,
            ),
        })
    }

    fn call(&self, reg: &Registry, op: OpId, args: &[Value]) -> Result<Value, DispatchError> {
        match self {
            Counterpart::Element { mode, slot } => call_element(reg, *mode, op, *slot, args),
            Counterpart::Function(f) => f(reg, args),
        }
    }
}

/// What one generic loop evaluates and where its results go.
struct LoopCtx<'r> {
    reg: &'r Registry,
    op: OpId,
    counterpart: Counterpart<'r>,
    res_desc: &'r ArrayDescriptor,
}

fn generic_loop(
    ctx: &LoopCtx<'_>,
    movable: bool,
    desc: &ArrayDescriptor,
    mut local: Operands,
    operands: &mut [Value],
) -> Result<Applied, DispatchError> {
    let reg = ctx.reg;
    let lens: Sizes = local
        .iter()
        .map(|v| operand_len(reg, v))
        .collect::<Result<_, DispatchError>>()?;
    let lr = reconcile_lengths(&lens)?;

    let reuse = movable && (desc.shape().fixed().is_some() || lens[0] == lr);

    if reuse {
        trace!(op = ctx.op.name(), ty = desc.name(), len = lr, "generic loop, reusing operand 0");
        // Operands aliasing operand 0 are read back from the target itself,
        // so every other handle is released before taking it mutably.
        let aliased: Aliases = local.iter().map(|v| v.ptr_eq(&operands[0])).collect();
        for (value, &alias) in local.iter_mut().zip(&aliased) {
            if alias {
                *value = placeholder();
            }
        }
        let detached = detach_aliases(operands);
        let filled = match &mut operands[0] {
            Value::Array(slot) => fill(ctx, &local, &lens, lr, Arc::make_mut(slot), &aliased),
            Value::Scalar(_) => Ok(()),
        };
        reattach_aliases(operands, &detached);
        filled?;
        return Ok(Applied::Value(operands[0].clone()));
    }

    trace!(op = ctx.op.name(), ty = desc.name(), len = lr, "generic loop");
    let mut out: UninitArray = ctx.res_desc.alloc(reg, lr)?;
    let aliased: Aliases = local.iter().map(|_| false).collect();
    fill(ctx, &local, &lens, lr, out.array_mut(), &aliased)?;
    let result = Value::from(out.mark_ready());
    drop(local);
    Ok(Applied::Value(finish(movable, operands, result)))
}

type Aliases = SmallVec<[bool; 3]>;

fn placeholder() -> Value {
    Value::Scalar(Scalar::Boolean(false))
}

/// Runs the per-position loop, writing into `target`.
///
/// Operands flagged in `from_target` are read from `target` itself. Position
/// `i` is always read before it is written.
fn fill(
    ctx: &LoopCtx<'_>,
    local: &[Value],
    lens: &[usize],
    lr: usize,
    target: &mut Array,
    from_target: &[bool],
) -> Result<(), DispatchError> {
    let mut args: Operands = SmallVec::new();
    for i in 0..lr {
        args.clear();
        for (k, value) in local.iter().enumerate() {
            let j = if lens[k] == 1 { 0 } else { i };
            let item = if from_target[k] {
                ctx.res_desc.item(target, j)
            } else {
                item_of(ctx.reg, value, j)?
            };
            args.push(item.ok_or(ErrorKind::ItemAccess { index: j })?);
        }
        let out = ctx
            .counterpart
            .call(ctx.reg, ctx.op, &args)
            .map_err(|e| e.within(Frame::Element(i)))?;
        ctx.res_desc.set_item(target, i, out).map_err(|v| ErrorKind::ItemAssign {
            index: i,
            found: ctx.reg.type_name(&v),
        })?;
    }
    Ok(())
}

fn operand_len(reg: &Registry, value: &Value) -> Result<usize, DispatchError> {
    match value {
        Value::Scalar(_) => Ok(1),
        Value::Array(a) => Ok(reg.descriptor(a.type_key())?.len_of(a)),
    }
}

fn item_of(reg: &Registry, value: &Value, index: usize) -> Result<Option<Value>, DispatchError> {
    match value {
        Value::Scalar(_) => Ok(Some(value.clone())),
        Value::Array(a) => Ok(reg.descriptor(a.type_key())?.item(a, index)),
    }
}

fn arrays_of<'a>(reg: &Registry, local: &'a [Value]) -> Result<SmallVec<[&'a Array; 3]>, DispatchError> {
    local
        .iter()
        .map(|v| {
            v.as_array().map(|a| a.as_ref()).ok_or_else(|| {
                ErrorKind::TypeError(format!("native kernel received scalar {}", reg.type_name(v)))
                    .into()
            })
        })
        .collect()
}

fn run_kernel(
    op: OpId,
    slot: Slot,
    kernel: NativeKernel,
    arrays: &[&Array],
    out: &mut UninitArray,
) -> Result<(), ErrorKind> {
    match (kernel, arrays, slot) {
        (NativeKernel::Unary(k), [a], _) => k(a, out),
        (NativeKernel::Binary(k), [a, b], _) => k(a, b, out),
        (NativeKernel::Ternary(k), [a, b, c], _) => k(a, b, c, out),
        (NativeKernel::Compare(k), [a, b], Slot::Compare(cmp)) => k(a, b, cmp, out),
        _ => Err(ErrorKind::Arity { op: op.name(), expected: kernel.arity(), found: arrays.len() }),
    }
}

/// Stores `result` into operand 0 when `movable` and returns the value to hand back.
///
/// When operand 0 is uniquely owned its allocation receives the new contents,
/// so existing identity checks against it keep holding. Operands that alias
/// operand 0 follow it.
pub(crate) fn finish(movable: bool, operands: &mut [Value], result: Value) -> Value {
    if !movable {
        return result;
    }
    let detached = detach_aliases(operands);
    match (&mut operands[0], result) {
        (Value::Array(slot), Value::Array(res)) => match Arc::get_mut(slot) {
            Some(inner) => *inner = Arc::unwrap_or_clone(res),
            None => *slot = res,
        },
        (slot, res) => *slot = res,
    }
    reattach_aliases(operands, &detached);
    operands[0].clone()
}

/// Releases the caller's extra handles on operand 0, e.g. both sides of `x += x`.
fn detach_aliases(operands: &mut [Value]) -> Aliases {
    let mut detached = Aliases::new();
    detached.push(false);
    for k in 1..operands.len() {
        let alias = operands[k].ptr_eq(&operands[0]);
        if alias {
            operands[k] = placeholder();
        }
        detached.push(alias);
    }
    detached
}

fn reattach_aliases(operands: &mut [Value], detached: &[bool]) {
    for k in 1..operands.len() {
        if detached[k] {
            operands[k] = operands[0].clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::operators::CompareOp;
    use crate::enums::scalar::ScalarKind;
    use crate::enums::shape_dim::ShapeDim;
    use crate::kernels::native;
    use crate::structs::descriptor::{TypeFlags, TypeKey};

    struct Types {
        reg: Registry,
        b: TypeKey,
        i: TypeKey,
        f: TypeKey,
        c: TypeKey,
    }

    fn types() -> Types {
        let mut reg = Registry::new();
        let b = reg
            .register(
                ArrayDescriptor::flat("B", ScalarKind::Boolean, ShapeDim::Dynamic)
                    .with_op(OpId::Add, OpEntry::NotImplemented),
            )
            .unwrap();
        let i = reg
            .register(ArrayDescriptor::flat("I", ScalarKind::Int32, ShapeDim::Dynamic).with_mask(b))
            .unwrap();
        let f = reg
            .register(
                ArrayDescriptor::flat("F", ScalarKind::Float32, ShapeDim::Dynamic)
                    .with_mask(b)
                    .with_op(OpId::Add, OpEntry::Native(NativeKernel::Binary(native::add))),
            )
            .unwrap();
        let c = reg
            .register(
                ArrayDescriptor::flat("C", ScalarKind::Float32, ShapeDim::Fixed(2))
                    .with_mask(b)
                    .with_flags(TypeFlags { is_complex: true, ..Default::default() }),
            )
            .unwrap();
        Types { reg, b, i, f, c }
    }

    fn run(reg: &Registry, mode: ApplyMode, op: OpId, slot: Slot, operands: &mut [Value]) -> Value {
        apply(reg, mode, op, slot, operands).unwrap().value().unwrap()
    }

    #[test]
    fn test_scalars_evaluate_directly() {
        let ty = types();
        let out = run(&ty.reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut [Value::from(2i32), Value::from(1.5f64)]);
        assert_eq!(out, Value::from(3.5f64));
    }

    #[test]
    fn test_generic_loop_broadcasts_length_one() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![2i32]).unwrap(), reg.array(ty.i, vec![1i32, 2, 3]).unwrap()];
        let out = run(reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut ops);
        assert_eq!(out, reg.array(ty.i, vec![3i32, 4, 5]).unwrap());
    }

    #[test]
    fn test_size_mismatch_carries_frame() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![1i32, 2]).unwrap(), reg.array(ty.i, vec![1i32, 2, 3]).unwrap()];
        let err = apply(reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut ops).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::SizeIncompatible { sizes: vec![2, 3] });
        assert_eq!(err.to_string(), "I.add(): invalid input array sizes (2 and 3)");
    }

    #[test]
    fn test_not_implemented_leaves_operands() {
        let ty = types();
        let reg = &ty.reg;
        let a = reg.array(ty.b, vec![true]).unwrap();
        let mut ops = [a.clone(), a.clone()];
        let out = apply(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops).unwrap();
        assert!(out.is_not_implemented());
        assert!(ops[0].ptr_eq(&a));
    }

    #[test]
    fn test_in_place_reuses_storage() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![1i32, 2, 3]).unwrap(), reg.array(ty.i, vec![10i32]).unwrap()];
        let before = ops[0].as_array().unwrap().storage_ptr();
        let out = run(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops);
        assert!(out.ptr_eq(&ops[0]));
        assert_eq!(ops[0].as_array().unwrap().storage_ptr(), before);
        assert_eq!(ops[0].as_array().unwrap().as_i32(), Some(&[11, 12, 13][..]));
    }

    #[test]
    fn test_in_place_grows_operand() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![1i32]).unwrap(), reg.array(ty.i, vec![1i32, 2]).unwrap()];
        let out = run(reg, ApplyMode::InPlace, OpId::Sub, Slot::Method, &mut ops);
        assert!(out.ptr_eq(&ops[0]));
        assert_eq!(ops[0].as_array().unwrap().as_i32(), Some(&[0, -1][..]));
    }

    #[test]
    fn test_in_place_native_keeps_identity() {
        let ty = types();
        let reg = &ty.reg;
        let first = reg.array(ty.f, vec![1.0f32, 2.0]).unwrap();
        let handle = first.as_array().unwrap().as_ref() as *const Array;
        let mut ops = [first, reg.array(ty.f, vec![0.5f32]).unwrap()];
        let out = run(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops);
        assert_eq!(out.as_array().unwrap().as_ref() as *const Array, handle);
        assert_eq!(ops[0].as_array().unwrap().as_f32(), Some(&[1.5f32, 2.5][..]));
    }

    #[test]
    fn test_in_place_skips_converted_operand() {
        let ty = types();
        let reg = &ty.reg;
        let first = reg.array(ty.i, vec![1i32, 2]).unwrap();
        let mut ops = [first.clone(), reg.array(ty.f, vec![0.5f32, 0.5]).unwrap()];
        let out = run(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops);
        assert!(ops[0].ptr_eq(&first));
        assert_eq!(out, reg.array(ty.f, vec![1.5f32, 2.5]).unwrap());
    }

    #[test]
    fn test_rich_compare_yields_mask() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![1i32, 5, 3]).unwrap(), Value::from(3i32)];
        let out = run(reg, ApplyMode::RichCompare, OpId::RichCompare, Slot::Compare(CompareOp::Ge), &mut ops);
        assert_eq!(out, reg.array(ty.b, vec![false, true, true]).unwrap());
    }

    #[test]
    fn test_ordering_rejected_on_complex() {
        let ty = types();
        let reg = &ty.reg;
        let z = reg.array(ty.c, vec![1.0f32, 0.0]).unwrap();
        let mut ops = [z.clone(), z.clone()];
        let err = apply(reg, ApplyMode::RichCompare, OpId::RichCompare, Slot::Compare(CompareOp::Lt), &mut ops)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidComparison);
        assert_eq!(err.context(), &[Frame::Method { type_name: "C".into(), op: "richcmp" }]);
        let eq = run(reg, ApplyMode::RichCompare, OpId::RichCompare, Slot::Compare(CompareOp::Eq), &mut ops);
        assert_eq!(eq, reg.array(ty.b, vec![true, true]).unwrap());
    }

    #[test]
    fn test_select_takes_type_from_second_operand() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [
            reg.array(ty.b, vec![true, false]).unwrap(),
            reg.array(ty.f, vec![1.0f32, 2.0]).unwrap(),
            Value::from(0.0f32),
        ];
        let out = run(reg, ApplyMode::Select, OpId::Select, Slot::Method, &mut ops);
        assert_eq!(out, reg.array(ty.f, vec![1.0f32, 0.0]).unwrap());
    }

    #[test]
    fn test_function_slot_frames() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.f, vec![4.0f32]).unwrap()];
        let out = run(reg, ApplyMode::Normal, OpId::Sqrt, Slot::Function("sqrt"), &mut ops);
        assert_eq!(out, reg.array(ty.f, vec![2.0f32]).unwrap());

        let err = apply(reg, ApplyMode::Normal, OpId::Sqrt, Slot::Function("nope"), &mut ops).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownFunction("nope".into()));
        assert_eq!(err.to_string(), "minapply.nope(<F>): no function named 'nope' is registered");
    }

    #[test]
    fn test_element_failure_is_located() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![4i32, 1]).unwrap(), reg.array(ty.i, vec![2i32, 0]).unwrap()];
        let err = apply(reg, ApplyMode::Normal, OpId::FloorDiv, Slot::Method, &mut ops).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Kernel(_)));
        assert_eq!(err.context()[0], Frame::Element(1));
        assert_eq!(err.context()[1], Frame::Method { type_name: "I".into(), op: "floordiv" });
    }

    #[test]
    fn test_arity_checked() {
        let ty = types();
        let err = apply(&ty.reg, ApplyMode::Select, OpId::Select, Slot::Method, &mut [Value::from(true)]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Arity { expected: 3, found: 1, .. }));
    }

    #[test]
    fn test_frame_names_unified_type() {
        let ty = types();
        let reg = &ty.reg;
        let mut ops = [reg.array(ty.i, vec![1i32, 2]).unwrap(), reg.array(ty.f, vec![1.0f32, 2.0, 3.0]).unwrap()];
        let err = apply(reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut ops).unwrap_err();
        assert_eq!(err.context().last(), Some(&Frame::Method { type_name: "F".into(), op: "add" }));
        assert_eq!(err.to_string(), "F.add(): invalid input array sizes (2 and 3)");

        let mut ops = [Value::from(1i32), reg.array(ty.i, vec![1i32, 0]).unwrap()];
        let err = apply(reg, ApplyMode::Normal, OpId::FloorDiv, Slot::Method, &mut ops).unwrap_err();
        assert_eq!(
            err.to_string(),
            "I.floordiv(): element 1: kernel failed: integer division by zero"
        );
    }

    #[test]
    fn test_in_place_with_operand_aliased() {
        let ty = types();
        let reg = &ty.reg;
        let a = reg.array(ty.i, vec![1i32, 2, 3]).unwrap();
        let before = a.as_array().unwrap().storage_ptr();
        let mut ops = [a.clone(), a];
        let out = run(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops);
        assert!(out.ptr_eq(&ops[0]));
        assert!(ops[1].ptr_eq(&ops[0]));
        assert_eq!(ops[0].as_array().unwrap().storage_ptr(), before);
        assert_eq!(ops[0].as_array().unwrap().as_i32(), Some(&[2, 4, 6][..]));

        let f = reg.array(ty.f, vec![1.0f32, 2.0]).unwrap();
        let handle = f.as_array().unwrap().as_ref() as *const Array;
        let mut ops = [f.clone(), f];
        run(reg, ApplyMode::InPlace, OpId::Add, Slot::Method, &mut ops);
        assert_eq!(ops[0].as_array().unwrap().as_ref() as *const Array, handle);
        assert!(ops[1].ptr_eq(&ops[0]));
        assert_eq!(ops[0].as_array().unwrap().as_f32(), Some(&[2.0f32, 4.0][..]));
    }

    fn plain_item(array: &Array, index: usize) -> Option<Value> {
        array.data().get(index)
    }

    fn holey_item(array: &Array, index: usize) -> Option<Value> {
        if index == 1 { None } else { plain_item(array, index) }
    }

    fn plain_set(array: &mut Array, index: usize, value: Value) -> Result<(), Value> {
        array.data_mut().set(index, value)
    }

    fn refuse_set(_array: &mut Array, _index: usize, value: Value) -> Result<(), Value> {
        Err(value)
    }

    fn plain_len(array: &Array) -> usize {
        array.len()
    }

    #[test]
    fn test_accessor_failures() {
        let mut reg = Registry::new();
        let holey = reg
            .register(
                ArrayDescriptor::flat("Holey", ScalarKind::Int32, ShapeDim::Dynamic)
                    .with_accessors(holey_item, plain_set, plain_len),
            )
            .unwrap();
        let sealed = reg
            .register(
                ArrayDescriptor::flat("Sealed", ScalarKind::Int32, ShapeDim::Dynamic)
                    .with_accessors(plain_item, refuse_set, plain_len),
            )
            .unwrap();

        let mut ops = [reg.array(holey, vec![1i32, 2, 3]).unwrap(), reg.array(holey, vec![1i32]).unwrap()];
        let err = apply(&reg, ApplyMode::Normal, OpId::Add, Slot::Method, &mut ops).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ItemAccess { index: 1 });
        assert_eq!(err.context(), &[Frame::Method { type_name: "Holey".into(), op: "add" }]);

        let mut ops = [reg.array(sealed, vec![1i32, 2]).unwrap(), reg.array(sealed, vec![1i32, 2]).unwrap()];
        let err = apply(&reg, ApplyMode::Normal, OpId::Mul, Slot::Method, &mut ops).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ItemAssign { index: 0, found: "int32".into() });
        assert_eq!(
            err.to_string(),
            "Sealed.mul(): Item assignment failed at index 0 (value of type 'int32')!"
        );
    }
}
