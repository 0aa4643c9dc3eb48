// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Walk Module
//!
//! Depth-first walkers over [`Tree`]s.
//!
//! - [`traverse`] calls back once per leaf array.
//! - [`traverse_pair`] walks two trees in lockstep and calls back on matching
//! leaves. Any disagreement in node kind, length or keys is an error.
//! - [`transform`] rebuilds a tree, letting a [`TransformCallback`] fill in a
//! fresh instance for every leaf.
//!
//! Tensors are handed to the callback through their flat array. Arrays of
//! arrays are walked element by element. Scalars, opaque values and empty
//! nodes are not visited.
//!
//! Each level annotates a failure with a [`Frame::Walk`] naming the node
//! type(s), so a leaf error carries the path of types down to it.

use std::sync::Arc;

use tracing::trace;

use crate::enums::error::{DispatchError, ErrorKind, Frame};
use crate::enums::tree::Tree;
use crate::enums::value::Value;
use crate::structs::array::{Array, ArrayData};
use crate::structs::record::Record;
use crate::structs::registry::Registry;
use crate::traits::callbacks::TransformCallback;

/// Visits every leaf array of `tree` in depth-first, declared order.
///
/// # Example
/// ```rust
/// use minapply::{traverse, ArrayDescriptor, Registry, ScalarKind, ShapeDim, Tree};
///
/// let mut reg = Registry::new();
/// let f = reg.register(ArrayDescriptor::flat("F", ScalarKind::Float32, ShapeDim::Dynamic)).unwrap();
/// let tree = Tree::List(vec![
///     Tree::from(reg.array(f, vec![1.0f32]).unwrap()),
///     Tree::from(reg.array(f, vec![2.0f32, 3.0]).unwrap()),
/// ]);
/// let mut lens = Vec::new();
/// traverse(&reg, "count", |v| {
///     lens.push(v.as_array().map_or(0, |a| a.len()));
///     Ok(())
/// }, &tree)
/// .unwrap();
/// assert_eq!(lens, [1, 2]);
/// ```
pub fn traverse<F>(reg: &Registry, op: &str, mut callback: F, tree: &Tree) -> Result<(), DispatchError>
where
    F: FnMut(&Value) -> Result<(), DispatchError>,
{
    traverse_node(reg, op, &mut callback, tree)
}

fn traverse_node<F>(reg: &Registry, op: &str, cb: &mut F, node: &Tree) -> Result<(), DispatchError>
where
    F: FnMut(&Value) -> Result<(), DispatchError>,
{
    visit(reg, op, cb, node).map_err(|e| e.within(walk_frame(reg, op, &[node])))
}

fn visit<F>(reg: &Registry, op: &str, cb: &mut F, node: &Tree) -> Result<(), DispatchError>
where
    F: FnMut(&Value) -> Result<(), DispatchError>,
{
    match node {
        Tree::Value(value @ Value::Array(a)) => {
            let desc = reg.descriptor(a.type_key())?;
            if desc.is_tensor() {
                cb(&Value::Array(desc.tensor_array(a)?.clone()))
            } else if desc.ndim() > 1 {
                for i in 0..desc.len_of(a) {
                    let item = desc.item(a, i).ok_or(ErrorKind::ItemAccess { index: i })?;
                    traverse_node(reg, op, cb, &Tree::Value(item))?;
                }
                Ok(())
            } else {
                cb(value)
            }
        }
        Tree::List(items) | Tree::Tuple(items) => {
            items.iter().try_for_each(|t| traverse_node(reg, op, cb, t))
        }
        Tree::Map(entries) => entries.values().try_for_each(|t| traverse_node(reg, op, cb, t)),
        Tree::Record(record) => record.values().iter().try_for_each(|t| traverse_node(reg, op, cb, t)),
        Tree::Value(Value::Scalar(_)) | Tree::Opaque(_) | Tree::Empty => Ok(()),
    }
}

/// Walks `a` and `b` in lockstep, calling back on each pair of leaf arrays.
///
/// Both trees must have the same node kinds and types at every position,
/// sequences of equal length, and mappings with identical key sets.
pub fn traverse_pair<F>(
    reg: &Registry,
    op: &str,
    mut callback: F,
    a: &Tree,
    b: &Tree,
) -> Result<(), DispatchError>
where
    F: FnMut(&Value, &Value) -> Result<(), DispatchError>,
{
    traverse_pair_node(reg, op, &mut callback, a, b)
}

fn traverse_pair_node<F>(reg: &Registry, op: &str, cb: &mut F, a: &Tree, b: &Tree) -> Result<(), DispatchError>
where
    F: FnMut(&Value, &Value) -> Result<(), DispatchError>,
{
    visit_pair(reg, op, cb, a, b).map_err(|e| e.within(walk_frame(reg, op, &[a, b])))
}

fn visit_pair<F>(reg: &Registry, op: &str, cb: &mut F, a: &Tree, b: &Tree) -> Result<(), DispatchError>
where
    F: FnMut(&Value, &Value) -> Result<(), DispatchError>,
{
    match (a, b) {
        (Tree::Value(x), Tree::Value(y)) => {
            if x.type_tag() != y.type_tag() {
                return Err(mismatched_types());
            }
            let (Value::Array(xa), Value::Array(ya)) = (x, y) else {
                return Ok(());
            };
            let desc = reg.descriptor(xa.type_key())?;
            if desc.is_tensor() {
                let (fx, fy) = (desc.tensor_array(xa)?, desc.tensor_array(ya)?);
                cb(&Value::Array(fx.clone()), &Value::Array(fy.clone()))
            } else if desc.ndim() > 1 {
                let len = same_length(desc.len_of(xa), desc.len_of(ya))?;
                for i in 0..len {
                    let ix = desc.item(xa, i).ok_or(ErrorKind::ItemAccess { index: i })?;
                    let iy = desc.item(ya, i).ok_or(ErrorKind::ItemAccess { index: i })?;
                    traverse_pair_node(reg, op, cb, &Tree::Value(ix), &Tree::Value(iy))?;
                }
                Ok(())
            } else {
                cb(x, y)
            }
        }
        (Tree::List(xs), Tree::List(ys)) | (Tree::Tuple(xs), Tree::Tuple(ys)) => {
            same_length(xs.len(), ys.len())?;
            xs.iter().zip(ys).try_for_each(|(x, y)| traverse_pair_node(reg, op, cb, x, y))
        }
        (Tree::Map(xs), Tree::Map(ys)) => {
            if !xs.keys().eq(ys.keys()) {
                return Err(ErrorKind::StructuralMismatch(
                    "Dictionaries have mismatched keys.".to_string(),
                )
                .into());
            }
            xs.values().zip(ys.values()).try_for_each(|(x, y)| traverse_pair_node(reg, op, cb, x, y))
        }
        (Tree::Record(x), Tree::Record(y)) if x.same_type(y) => x
            .values()
            .iter()
            .zip(y.values())
            .try_for_each(|(x, y)| traverse_pair_node(reg, op, cb, x, y)),
        (Tree::Opaque(x), Tree::Opaque(y)) if x.same_type(y.as_ref()) => Ok(()),
        (Tree::Empty, Tree::Empty) => Ok(()),
        _ => Err(mismatched_types()),
    }
}

/// Rebuilds `tree` with every leaf array replaced by the callback's output.
///
/// Containers keep their kind, keys and record type. A leaf whose type the
/// callback declines becomes [`Tree::Empty`]. Scalars and opaque values are
/// carried over unchanged.
pub fn transform<C>(reg: &Registry, op: &str, mut callback: C, tree: &Tree) -> Result<Tree, DispatchError>
where
    C: TransformCallback,
{
    transform_node(reg, op, &mut callback, tree)
}

fn transform_node<C>(reg: &Registry, op: &str, cb: &mut C, node: &Tree) -> Result<Tree, DispatchError>
where
    C: TransformCallback,
{
    rebuild(reg, op, cb, node).map_err(|e| e.within(walk_frame(reg, op, &[node])))
}

fn rebuild<C>(reg: &Registry, op: &str, cb: &mut C, node: &Tree) -> Result<Tree, DispatchError>
where
    C: TransformCallback,
{
    Ok(match node {
        Tree::Value(Value::Array(a)) => match rebuild_array(reg, op, cb, a)? {
            Some(out) => Tree::Value(Value::from(out)),
            None => Tree::Empty,
        },
        Tree::List(items) => Tree::List(rebuild_all(reg, op, cb, items)?),
        Tree::Tuple(items) => Tree::Tuple(rebuild_all(reg, op, cb, items)?),
        Tree::Map(entries) => Tree::Map(
            entries
                .iter()
                .map(|(k, t)| Ok((k.clone(), transform_node(reg, op, cb, t)?)))
                .collect::<Result<_, DispatchError>>()?,
        ),
        Tree::Record(record) => Tree::Record(Record::new(
            record.manifest().clone(),
            rebuild_all(reg, op, cb, record.values())?,
        )?),
        Tree::Value(Value::Scalar(_)) | Tree::Opaque(_) | Tree::Empty => node.clone(),
    })
}

fn rebuild_all<C>(reg: &Registry, op: &str, cb: &mut C, items: &[Tree]) -> Result<Vec<Tree>, DispatchError>
where
    C: TransformCallback,
{
    items.iter().map(|t| transform_node(reg, op, cb, t)).collect()
}

/// Fresh instance of the remapped type filled from `source`, or `None` when declined.
fn rebuild_array<C>(
    reg: &Registry,
    op: &str,
    cb: &mut C,
    source: &Arc<Array>,
) -> Result<Option<Array>, DispatchError>
where
    C: TransformCallback,
{
    let desc = reg.descriptor(source.type_key())?;
    let Some(to) = cb.transform_type(reg, desc.key()) else {
        trace!(op, ty = desc.name(), "transform declined");
        return Ok(None);
    };
    let target_desc = reg.descriptor(to)?;

    if desc.is_tensor() {
        let mut out = target_desc.alloc_tensor(reg, desc.tensor_shape(source)?)?;
        if let ArrayData::Tensor { array, .. } = out.data_mut() {
            cb.transform(reg, desc.tensor_array(source)?, Arc::make_mut(array))?;
        }
        return Ok(Some(out));
    }

    let len = desc.len_of(source);
    let mut out = target_desc.alloc_zero(reg, target_desc.shape().fixed().unwrap_or(0))?;
    target_desc.init(reg, &mut out, len)?;
    if desc.ndim() == 1 {
        cb.transform(reg, source, &mut out)?;
        return Ok(Some(out));
    }
    for i in 0..len {
        let item = desc.item(source, i).ok_or(ErrorKind::ItemAccess { index: i })?;
        match transform_node(reg, op, cb, &Tree::Value(item))? {
            Tree::Value(v) => target_desc.set_item(&mut out, i, v).map_err(|v| {
                ErrorKind::ItemAssign { index: i, found: reg.type_name(&v) }
            })?,
            other => {
                return Err(ErrorKind::ItemAssign { index: i, found: other.type_name(reg) }.into());
            }
        }
    }
    Ok(Some(out))
}

fn same_length(a: usize, b: usize) -> Result<usize, ErrorKind> {
    if a != b {
        return Err(ErrorKind::StructuralMismatch(format!(
            "Incompatible input lengths ({} and {}).",
            a, b
        )));
    }
    Ok(a)
}

fn mismatched_types() -> DispatchError {
    ErrorKind::StructuralMismatch("Mismatched input types.".to_string()).into()
}

fn walk_frame(reg: &Registry, op: &str, nodes: &[&Tree]) -> Frame {
    Frame::Walk { op: op.to_string(), types: nodes.iter().map(|t| t.type_name(reg)).collect() }
}
