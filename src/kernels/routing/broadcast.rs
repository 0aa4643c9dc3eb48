// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Broadcast Module
//!
//! Length and shape reconciliation, plus the index gather that materialises a
//! tensor's flat array at a larger shape.

use std::sync::Arc;

use crate::enums::error::ErrorKind;
use crate::structs::array::Array;

/// Common length of operands that broadcast by pinning length-1 cursors.
///
/// Every length must be 1 or the maximum.
pub fn reconcile_lengths(lens: &[usize]) -> Result<usize, ErrorKind> {
    let lr = lens.iter().copied().max().unwrap_or(0);
    if lens.iter().any(|&l| l != 1 && l != lr) {
        return Err(ErrorKind::SizeIncompatible { sizes: lens.to_vec() });
    }
    Ok(lr)
}

/// Target shape of a tensor operation.
///
/// Rank-0 operands fit any shape. Every other operand must have the full rank,
/// and along each axis its extent must match the largest one or be 1.
pub fn reconcile_shapes(shapes: &[Vec<usize>]) -> Result<Vec<usize>, ErrorKind> {
    let ndim = shapes.iter().map(Vec::len).max().unwrap_or(0);
    if shapes.len() > 1 && shapes.iter().any(|s| !s.is_empty() && s.len() != ndim) {
        return Err(ErrorKind::RankIncompatible { shapes: shapes.to_vec() });
    }
    let mut shape = Vec::with_capacity(ndim);
    for axis in 0..ndim {
        let extent = |s: &Vec<usize>| if s.is_empty() { 1 } else { s[axis] };
        let value = shapes.iter().map(extent).max().unwrap_or(1);
        if shapes.iter().any(|s| !s.is_empty() && s[axis] != value && s[axis] != 1) {
            return Err(ErrorKind::ShapeIncompatible { shapes: shapes.to_vec() });
        }
        shape.push(value);
    }
    Ok(shape)
}

/// Gather indices expanding a flat array of shape `src` to shape `dst`.
///
/// Both shapes have the same rank. Axes are processed outermost first with a
/// shrinking block size; wherever `src` has extent 1 and `dst` does not,
/// `index = index % next + (index / block) * next`.
pub fn broadcast_index(src: &[usize], dst: &[usize]) -> Vec<usize> {
    let mut block: usize = dst.iter().product();
    let mut index: Vec<usize> = (0..block).collect();
    if block == 0 {
        return index;
    }
    for (&s, &d) in src.iter().zip(dst) {
        let next = block / d;
        if s == 1 && d != 1 {
            for x in index.iter_mut() {
                *x = *x % next + (*x / block) * next;
            }
        }
        block = next;
    }
    index
}

/// Materialises `array`, laid out with shape `src`, at shape `dst`.
///
/// Rank-0 sources and sources already at `dst` are returned as they are.
pub fn tensor_broadcast(
    array: &Arc<Array>,
    src: &[usize],
    dst: &[usize],
) -> Result<Arc<Array>, ErrorKind> {
    if src.is_empty() || src == dst {
        return Ok(array.clone());
    }
    let index = broadcast_index(src, dst);
    let data = array.data().gather(&index).ok_or(ErrorKind::ItemAccess {
        index: index.iter().copied().max().unwrap_or(0),
    })?;
    Ok(Arc::new(Array::new(array.type_key(), data)))
}
