// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Record Module
//!
//! Named-field containers described by a [`FieldManifest`].
//!
//! The manifest is declared once per record type and shared between its
//! instances. The walkers visit a record's fields in manifest order.

use std::sync::Arc;

use crate::enums::error::{DispatchError, ErrorKind};
use crate::enums::tree::Tree;

/// Ordered field names of a record type, with the declared type of each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldManifest {
    type_name: String,
    fields: Vec<(String, String)>,
}

impl FieldManifest {
    /// Declares a record type. Field names must be unique.
    pub fn new<N, T>(type_name: &str, fields: impl IntoIterator<Item = (N, T)>) -> Result<Arc<Self>, DispatchError>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let fields: Vec<(String, String)> =
            fields.into_iter().map(|(n, t)| (n.into(), t.into())).collect();
        for (i, (name, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(other, _)| other == name) {
                return Err(ErrorKind::TypeError(format!(
                    "field '{}' is declared twice on '{}'",
                    name, type_name
                ))
                .into());
            }
        }
        Ok(Arc::new(FieldManifest { type_name: type_name.to_string(), fields }))
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Declared type of `field`.
    pub fn declared_type(&self, field: &str) -> Option<&str> {
        self.fields.iter().find(|(n, _)| n == field).map(|(_, t)| t.as_str())
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == field)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// # Record
///
/// Instance of a record type: one [`Tree`] per manifest field.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    manifest: Arc<FieldManifest>,
    values: Vec<Tree>,
}

impl Record {
    /// Builds a record from field values given in manifest order.
    pub fn new(manifest: Arc<FieldManifest>, values: Vec<Tree>) -> Result<Self, DispatchError> {
        if values.len() != manifest.len() {
            return Err(ErrorKind::StructuralMismatch(format!(
                "'{}' declares {} fields, got {}",
                manifest.type_name(),
                manifest.len(),
                values.len()
            ))
            .into());
        }
        Ok(Record { manifest, values })
    }

    #[inline]
    pub fn manifest(&self) -> &Arc<FieldManifest> {
        &self.manifest
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.manifest.type_name()
    }

    pub fn get(&self, field: &str) -> Option<&Tree> {
        self.manifest.position(field).and_then(|i| self.values.get(i))
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Tree> {
        let i = self.manifest.position(field)?;
        self.values.get_mut(i)
    }

    /// `(name, value)` pairs in manifest order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.manifest.names().zip(self.values.iter())
    }

    #[inline]
    pub fn values(&self) -> &[Tree] {
        &self.values
    }

    /// `true` when both records are instances of the same record type.
    pub fn same_type(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.manifest, &other.manifest) || self.manifest == other.manifest
    }
}
