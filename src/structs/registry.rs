// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Registry Module
//!
//! Table of registered array types, named element-level functions, and the
//! type unifier. Every dispatch call receives a `&Registry` and resolves each
//! operand's [`ArrayDescriptor`] through it once per call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::operators::{ApplyMode, OpId, Slot};
use crate::enums::scalar::ScalarKind;
use crate::enums::value::Value;
use crate::kernels::routing::apply::call_element;
use crate::structs::array::{Array, ArrayData};
use crate::structs::descriptor::{ArrayDescriptor, Layout, TypeKey};
use crate::traits::unify::{PromoteUnifier, TypeUnifier};

/// Element-level function callable through [`Slot::Function`].
pub type ElementFn =
    Arc<dyn Fn(&Registry, &[Value]) -> Result<Value, DispatchError> + Send + Sync>;

/// # Registry
///
/// Runtime configuration of the dispatch engine.
///
/// ## Contents
/// - Array descriptors, addressed by [`TypeKey`] or by name.
/// - Named element functions. A function is registered for every operation
/// name up front, except `richcmp`, so `Slot::Function(op.name())` always
/// resolves.
/// - The [`TypeUnifier`] invoked when operand types differ.
#[derive(Clone)]
pub struct Registry {
    types: Vec<ArrayDescriptor>,
    names: HashMap<Arc<str>, TypeKey>,
    functions: HashMap<String, ElementFn>,
    unifier: Arc<dyn TypeUnifier>,
}

impl Registry {
    pub fn new() -> Self {
        let mut reg = Registry {
            types: Vec::new(),
            names: HashMap::new(),
            functions: HashMap::new(),
            unifier: Arc::new(PromoteUnifier),
        };
        for op in OpId::ALL {
            if op == OpId::RichCompare {
                continue;
            }
            let mode = if op == OpId::Select { ApplyMode::Select } else { ApplyMode::Normal };
            let name = op.name();
            reg.register_function(name, move |reg, args| {
                call_element(reg, mode, op, Slot::Function(name), args)
            });
        }
        reg
    }

    /// Adds a type and returns its key.
    ///
    /// Nested element types, tensor backing types and mask types must already
    /// be registered.
    pub fn register(&mut self, mut desc: ArrayDescriptor) -> Result<TypeKey, DispatchError> {
        if self.names.contains_key(desc.name()) {
            return Err(ErrorKind::TypeError(format!(
                "type '{}' is already registered",
                desc.name()
            ))
            .into());
        }
        desc.ndim = match desc.layout {
            Layout::Flat(_) => 1,
            Layout::Nested(element) => {
                let inner = self.descriptor(element)?;
                if inner.is_tensor() {
                    return Err(ErrorKind::TypeError(format!(
                        "'{}' cannot hold tensor elements",
                        desc.name()
                    ))
                    .into());
                }
                inner.ndim + 1
            }
            Layout::Tensor(array) => {
                let inner = self.descriptor(array)?;
                if inner.is_tensor() || inner.shape.fixed().is_some() {
                    return Err(ErrorKind::TypeError(format!(
                        "tensor '{}' needs a dynamic array type",
                        desc.name()
                    ))
                    .into());
                }
                inner.ndim
            }
        };
        if let Some(mask) = desc.mask {
            self.descriptor(mask)?;
        }
        let key = TypeKey::from_index(self.types.len());
        desc.key = key;
        self.names.insert(desc.name.clone(), key);
        self.types.push(desc);
        Ok(key)
    }

    /// Makes `f` callable as `Slot::Function(name)`, replacing any earlier entry.
    pub fn register_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Registry, &[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(f));
    }

    /// Replaces the default [`PromoteUnifier`].
    pub fn with_unifier<U: TypeUnifier + 'static>(mut self, unifier: U) -> Self {
        self.unifier = Arc::new(unifier);
        self
    }

    #[inline]
    pub fn unifier(&self) -> &dyn TypeUnifier {
        self.unifier.as_ref()
    }

    #[inline]
    pub fn function(&self, name: &str) -> Option<&ElementFn> {
        self.functions.get(name)
    }

    pub fn descriptor(&self, key: TypeKey) -> Result<&ArrayDescriptor, DispatchError> {
        self.types.get(key.index()).ok_or_else(|| {
            ErrorKind::TypeError(format!("no type registered under key {}", key)).into()
        })
    }

    /// Looks a type up by name.
    pub fn key(&self, name: &str) -> Option<TypeKey> {
        self.names.get(name).copied()
    }

    /// Element kind at the bottom of a type's nesting.
    pub fn leaf_kind(&self, key: TypeKey) -> Result<ScalarKind, DispatchError> {
        let mut desc = self.descriptor(key)?;
        loop {
            match desc.layout {
                Layout::Flat(kind) => return Ok(kind),
                Layout::Nested(inner) | Layout::Tensor(inner) => desc = self.descriptor(inner)?,
            }
        }
    }

    /// Name used in diagnostics.
    pub fn type_name(&self, value: &Value) -> String {
        match value {
            Value::Scalar(s) => s.kind().name().to_string(),
            Value::Array(a) => match self.descriptor(a.type_key()) {
                Ok(desc) => desc.name().to_string(),
                Err(_) => format!("<unregistered {}>", a.type_key()),
            },
        }
    }

    /// Instance of the flat or nested type `key` holding `data`.
    pub fn array(&self, key: TypeKey, data: impl Into<ArrayData>) -> Result<Value, DispatchError> {
        self.build(key, data.into()).map(Value::from)
    }

    fn build(&self, key: TypeKey, data: ArrayData) -> Result<Array, DispatchError> {
        let desc = self.descriptor(key)?;
        let fits = match (desc.layout, &data) {
            (Layout::Flat(kind), data) => data.kind() == Some(kind),
            (Layout::Nested(element), ArrayData::Nested(items)) => {
                items.iter().all(|v| v.type_key() == Some(element))
            }
            _ => false,
        };
        if !fits {
            return Err(ErrorKind::TypeError(format!(
                "data does not match the layout of '{}'",
                desc.name()
            ))
            .into());
        }
        if let Some(n) = desc.shape.fixed() {
            if data.len() != n {
                return Err(ErrorKind::SizeIncompatible { sizes: vec![data.len(), n] }.into());
            }
        }
        Ok(Array::new(key, data))
    }

    /// Tensor of type `key` over `data` with the given shape.
    pub fn tensor(
        &self,
        key: TypeKey,
        data: impl Into<ArrayData>,
        shape: &[usize],
    ) -> Result<Value, DispatchError> {
        let desc = self.descriptor(key)?;
        let Layout::Tensor(flat_key) = desc.layout else {
            return Err(ErrorKind::NotATensor(desc.name().to_string()).into());
        };
        let flat = self.build(flat_key, data.into())?;
        let size: usize = shape.iter().product();
        if flat.len() != size {
            return Err(ErrorKind::SizeIncompatible { sizes: vec![flat.len(), size] }.into());
        }
        let data = ArrayData::Tensor { array: Arc::new(flat), shape: shape.to_vec() };
        Ok(Value::from(Array::new(key, data)))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.types.iter().map(|d| d.name()).collect();
        f.debug_struct("Registry")
            .field("types", &names)
            .field("functions", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::shape_dim::ShapeDim;

    fn registry() -> (Registry, TypeKey, TypeKey) {
        let mut reg = Registry::new();
        let f = reg
            .register(ArrayDescriptor::flat("F", ScalarKind::Float32, ShapeDim::Dynamic))
            .unwrap();
        let v3 = reg.register(ArrayDescriptor::nested("V3", f, ShapeDim::Fixed(3))).unwrap();
        (reg, f, v3)
    }

    #[test]
    fn test_register_assigns_keys_and_depth() {
        let (reg, f, v3) = registry();
        assert_eq!(reg.key("F"), Some(f));
        assert_eq!(reg.descriptor(f).unwrap().ndim(), 1);
        assert_eq!(reg.descriptor(v3).unwrap().ndim(), 2);
        assert_eq!(reg.leaf_kind(v3).unwrap(), ScalarKind::Float32);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut reg, _, _) = registry();
        let err = reg
            .register(ArrayDescriptor::flat("F", ScalarKind::Int32, ShapeDim::Dynamic))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeError(_)));
    }

    #[test]
    fn test_every_op_but_richcmp_has_function() {
        let reg = Registry::new();
        for op in OpId::ALL {
            assert_eq!(reg.function(op.name()).is_some(), op != OpId::RichCompare, "{op}");
        }
    }

    #[test]
    fn test_array_validates_layout_and_extent() {
        let (reg, f, v3) = registry();
        assert!(reg.array(f, vec![1.0f32, 2.0]).is_ok());
        assert!(reg.array(f, vec![1i32]).is_err());
        let elem = reg.array(f, vec![1.0f32]).unwrap();
        assert!(reg.array(v3, vec![elem.clone(), elem.clone()]).is_err());
        assert!(reg.array(v3, vec![elem.clone(), elem.clone(), elem]).is_ok());
    }

    #[test]
    fn test_tensor_checks_size() {
        let (mut reg, f, _) = registry();
        let t = reg.register(ArrayDescriptor::tensor("T", f)).unwrap();
        assert!(reg.tensor(t, vec![1.0f32; 6], &[2, 3]).is_ok());
        assert!(reg.tensor(t, vec![1.0f32; 5], &[2, 3]).is_err());
        assert!(reg.tensor(f, vec![1.0f32], &[1]).is_err());
    }
}
