// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Routing Module
//!
//! Dispatching of operations onto native kernels or the generic element loop,
//! including length broadcasting, tensor shape reconciliation, and the tree
//! walkers that hand leaves to callers.

pub mod apply;
pub mod broadcast;
pub mod tensor;
pub mod walk;

pub use apply::{Applied, apply, call_element};
pub use broadcast::{broadcast_index, reconcile_lengths, reconcile_shapes, tensor_broadcast};
pub use tensor::apply_tensor;
pub use walk::{transform, traverse, traverse_pair};
