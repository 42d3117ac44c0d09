use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnProperty, EngineType, PropertySet};

/// Column metadata discovered for a table.
///
/// Two descriptors are considered the same column when their names match
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    name: String,
    type_name: String,
    engine_type: EngineType,
    size: Option<u32>,
    decimal_digits: Option<u32>,
    properties: PropertySet,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, engine_type: EngineType) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            engine_type,
            size: None,
            decimal_digits: None,
            properties: PropertySet::empty(),
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_decimal_digits(mut self, digits: u32) -> Self {
        self.decimal_digits = Some(digits);
        self
    }

    pub fn with_property(mut self, property: ColumnProperty) -> Self {
        self.properties.insert(property);
        self
    }

    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased name used as the lookup key everywhere.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Declared type name as reported by the engine (e.g. `int4`, `UUID`).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn decimal_digits(&self) -> Option<u32> {
        self.decimal_digits
    }

    pub fn properties(&self) -> PropertySet {
        self.properties
    }

    pub fn has_property(&self, property: ColumnProperty) -> bool {
        self.properties.contains(property)
    }

    pub fn is_nullable(&self) -> bool {
        self.has_property(ColumnProperty::Nullable)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.has_property(ColumnProperty::AutoIncrement)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for ColumnDescriptor {}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name, self.type_name)?;
        if let Some(size) = self.size {
            write!(f, ", size={size}")?;
        }
        if let Some(digits) = self.decimal_digits {
            write!(f, ", digits={digits}")?;
        }
        let properties: Vec<String> = self
            .properties
            .iter()
            .map(|property| format!("{property:?}"))
            .collect();
        if !properties.is_empty() {
            write!(f, ", [{}]", properties.join(","))?;
        }
        write!(f, ")")
    }
}
