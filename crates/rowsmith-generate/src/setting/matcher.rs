use std::fmt;
use std::sync::Arc;

use regex::Regex;
use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType};

use crate::errors::GenerationError;

/// Predicate over column metadata.
#[derive(Clone)]
pub struct ColumnMatcher {
    label: Arc<str>,
    test: Arc<dyn Fn(&ColumnDescriptor) -> bool + Send + Sync>,
}

impl ColumnMatcher {
    pub fn new<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&ColumnDescriptor) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into().into(),
            test: Arc::new(test),
        }
    }

    /// Case-insensitive column name match.
    pub fn name_is(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self::new(format!("name={name}"), move |column| column.key() == name)
    }

    pub fn name_matches(pattern: &str) -> Result<Self, GenerationError> {
        let regex = Regex::new(pattern).map_err(|err| {
            GenerationError::config(format!("invalid column pattern {pattern:?}: {err}"))
        })?;
        Ok(Self::new(format!("name~{pattern}"), move |column| {
            regex.is_match(column.name())
        }))
    }

    pub fn type_name_is(type_name: &str) -> Self {
        let type_name = type_name.trim().to_uppercase();
        Self::new(format!("type={type_name}"), move |column| {
            column.type_name().to_uppercase() == type_name
        })
    }

    pub fn engine_type_is(engine_type: EngineType) -> Self {
        Self::new(format!("engine_type={engine_type}"), move |column| {
            column.engine_type() == engine_type
        })
    }

    pub fn has_property(property: ColumnProperty) -> Self {
        Self::new(format!("property={property:?}"), move |column| {
            column.has_property(property)
        })
    }

    pub fn and(self, other: ColumnMatcher) -> Self {
        let label = format!("({} && {})", self.label, other.label);
        Self::new(label, move |column| {
            self.matches(column) && other.matches(column)
        })
    }

    pub fn or(self, other: ColumnMatcher) -> Self {
        let label = format!("({} || {})", self.label, other.label);
        Self::new(label, move |column| {
            self.matches(column) || other.matches(column)
        })
    }

    pub fn negate(self) -> Self {
        let label = format!("!{}", self.label);
        Self::new(label, move |column| !self.matches(column))
    }

    pub fn matches(&self, column: &ColumnDescriptor) -> bool {
        (self.test)(column)
    }
}

impl fmt::Debug for ColumnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ColumnMatcher").field(&self.label).finish()
    }
}
