// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # **Custom Value Trait Module** - *Lets any `Any + Send + Sync` type ride along inside a tree*
//!
//! Includes the [`CustomValue`] trait, enabling storage of arbitrary user-defined
//! values inside [`crate::Tree::Opaque`].
//!
//! Opaque nodes are neither containers nor array values. The walkers skip them
//! in `traverse`, require matching concrete types in `traverse_pair`, and pass
//! them through unchanged in `transform`.
//!
//! A blanket implementation covers every
//! `Send + Sync + Clone + PartialEq + Debug + 'static` type.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// # Custom Value
///
/// Trait for any object that can be stored in `Tree::Opaque`.
///
/// **Manual implementation is not required**: any type that implements
/// `Debug`, `Clone` and `PartialEq` and is `Send + Sync + 'static` picks it up
/// through the blanket impl.
///
/// Borrowed data cannot be stored directly, since `Any` requires `'static`.
/// Promote it to an owned type or wrap it in `Arc` first.
pub trait CustomValue: Any + Send + Sync + std::fmt::Debug {
    /// Downcasts the type as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Returns a deep clone of the object.
    ///
    /// Cloning a `Tree` only clones the `Arc`.
    fn deep_clone(&self) -> Arc<dyn CustomValue>;

    /// Performs semantic equality on the boxed object.
    ///
    /// This enables `PartialEq` for `Tree`, since `dyn CustomValue` cannot
    /// use `==` directly.
    fn eq_box(&self, other: &dyn CustomValue) -> bool;

    /// Concrete type name, used in walker diagnostics.
    fn type_name(&self) -> &'static str;

    /// `true` when `other` has the same concrete type.
    fn same_type(&self, other: &dyn CustomValue) -> bool {
        self.as_any().type_id() == other.as_any().type_id()
    }
}

impl<T> CustomValue for T
where
    T: Any + Send + Sync + Clone + PartialEq + std::fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn deep_clone(&self) -> Arc<dyn CustomValue> {
        Arc::new(self.clone())
    }

    fn eq_box(&self, other: &dyn CustomValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|o| self == o)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn same_type(&self, other: &dyn CustomValue) -> bool {
        other.as_any().type_id() == TypeId::of::<T>()
    }
}
