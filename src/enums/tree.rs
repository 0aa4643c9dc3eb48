// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Tree Module
//!
//! Nested container structures handed to the tree walkers.
//!
//! A [`Tree`] bottoms out at [`Value`]s. Array values are leaves; a tensor is
//! an array value whose descriptor says so, and the walkers descend into its
//! flat array. Sequences, mappings and records are walked child by child.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::enums::value::Value;
use crate::structs::record::Record;
use crate::structs::registry::Registry;
use crate::traits::custom_value::CustomValue;

/// # Tree
///
/// Recursive structure over scalars, arrays and tensors.
///
/// Mapping keys are kept sorted, which is also the order the walkers visit
/// them in.
#[derive(Clone)]
pub enum Tree {
    /// Scalar, array or tensor value.
    Value(Value),
    List(Vec<Tree>),
    Tuple(Vec<Tree>),
    Map(BTreeMap<String, Tree>),
    Record(Record),
    /// Value of a type the walkers do not look into.
    Opaque(Arc<dyn CustomValue>),
    /// Absent subtree, produced when `transform` declines a leaf.
    Empty,
}

impl Tree {
    pub fn opaque<T: CustomValue>(value: T) -> Self {
        Tree::Opaque(Arc::new(value))
    }

    /// Mapping built from `(key, subtree)` pairs. Later duplicates win.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Tree)>) -> Self {
        Tree::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Tree::Value(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Tree::Empty)
    }

    /// Name of the node's type, as reported in walker errors.
    pub fn type_name(&self, reg: &Registry) -> String {
        match self {
            Tree::Value(v) => reg.type_name(v),
            Tree::List(_) => "list".to_string(),
            Tree::Tuple(_) => "tuple".to_string(),
            Tree::Map(_) => "dict".to_string(),
            Tree::Record(r) => r.type_name().to_string(),
            Tree::Opaque(o) => o.type_name().to_string(),
            Tree::Empty => "None".to_string(),
        }
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tree::Value(a), Tree::Value(b)) => a == b,
            (Tree::List(a), Tree::List(b)) | (Tree::Tuple(a), Tree::Tuple(b)) => a == b,
            (Tree::Map(a), Tree::Map(b)) => a == b,
            (Tree::Record(a), Tree::Record(b)) => a == b,
            (Tree::Opaque(a), Tree::Opaque(b)) => a.eq_box(b.as_ref()),
            (Tree::Empty, Tree::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Value(v) => write!(f, "Value({})", v),
            Tree::List(items) => f.debug_tuple("List").field(items).finish(),
            Tree::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Tree::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Tree::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Tree::Opaque(o) => f.debug_tuple("Opaque").field(o).finish(),
            Tree::Empty => write!(f, "Empty"),
        }
    }
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        Tree::Value(value)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::List(items)
    }
}

impl From<Record> for Tree {
    fn from(record: Record) -> Self {
        Tree::Record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_tuple_differ() {
        let items = vec![Tree::from(Value::from(1i32))];
        assert_ne!(Tree::List(items.clone()), Tree::Tuple(items.clone()));
        assert_eq!(Tree::from(items.clone()), Tree::List(items));
    }

    #[test]
    fn test_map_sorts_keys() {
        let t = Tree::map([("b", Tree::Empty), ("a", Tree::Empty)]);
        let Tree::Map(m) = t else { panic!("expected map") };
        assert_eq!(m.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_opaque_equality_and_names() {
        let reg = Registry::new();
        let a = Tree::opaque(String::from("payload"));
        assert_eq!(a, Tree::opaque(String::from("payload")));
        assert_ne!(a, Tree::opaque(7u32));
        assert_eq!(a.type_name(&reg), "alloc::string::String");
        assert_eq!(Tree::Map(BTreeMap::new()).type_name(&reg), "dict");
    }
}
