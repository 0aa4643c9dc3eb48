// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Callbacks Module
//!
//! Leaf callbacks invoked by the tree walkers.
//!
//! `traverse` and `traverse_pair` accept plain closures. `transform` needs a
//! second hook to remap types, so it takes a [`TransformCallback`]
//! implementation. [`map_leaves`] adapts a closure for the common case where
//! types stay the same.

use crate::enums::error::DispatchError;
use crate::structs::array::{Array, ArrayData};
use crate::structs::descriptor::TypeKey;
use crate::structs::registry::Registry;

/// Leaf hooks for `transform`.
pub trait TransformCallback {
    /// Type of the rebuilt leaf, or `None` to drop the subtree.
    ///
    /// Called for every array node, including the elements of nested arrays.
    fn transform_type(&self, _reg: &Registry, ty: TypeKey) -> Option<TypeKey> {
        Some(ty)
    }

    /// Fills `target`, a zeroed instance of the remapped type sized like `source`.
    ///
    /// For tensors both arguments are the flat arrays.
    fn transform(&mut self, reg: &Registry, source: &Array, target: &mut Array) -> Result<(), DispatchError>;
}

/// [`TransformCallback`] that keeps every type and fills targets with a closure.
pub struct MapLeaves<F>(F);

/// Adapts `f(source) -> data` into a type-preserving [`TransformCallback`].
///
/// `map_leaves(|a| Ok(a.data().clone()))` is the identity transform.
pub fn map_leaves<F>(f: F) -> MapLeaves<F>
where
    F: FnMut(&Array) -> Result<ArrayData, DispatchError>,
{
    MapLeaves(f)
}

impl<F> TransformCallback for MapLeaves<F>
where
    F: FnMut(&Array) -> Result<ArrayData, DispatchError>,
{
    fn transform(&mut self, _reg: &Registry, source: &Array, target: &mut Array) -> Result<(), DispatchError> {
        *target.data_mut() = (self.0)(source)?;
        Ok(())
    }
}

impl<C: TransformCallback + ?Sized> TransformCallback for &mut C {
    fn transform_type(&self, reg: &Registry, ty: TypeKey) -> Option<TypeKey> {
        (**self).transform_type(reg, ty)
    }

    fn transform(&mut self, reg: &Registry, source: &Array, target: &mut Array) -> Result<(), DispatchError> {
        (**self).transform(reg, source, target)
    }
}
