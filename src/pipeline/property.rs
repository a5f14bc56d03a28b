//! Named groups of property values applied on reconfiguration.

use crate::variant::Variant;

/// A named list of property assignments.
///
/// Registered on an operation with `OperationCore::add_property_set` and
/// applied when a reconfiguration reaches the operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertySet {
    name: String,
    values: Vec<(String, Variant)>,
}

impl PropertySet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Builder-style [`PropertySet::set`].
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Variant>) -> Self {
        self.set(property, value);
        self
    }

    /// Adds or replaces a value. Assignment order is preserved.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Variant>) {
        let property = property.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == property) {
            Some(slot) => slot.1 = value,
            None => self.values.push((property, value)),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Variant> {
        self.values
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variant)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
