use std::sync::Arc;

use rowsmith_core::{ColumnDescriptor, Value};

use crate::errors::GenerationError;

/// One generated row, in insert column order.
///
/// Handed to row callbacks before the row is written; names are matched
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct Tuple {
    table: Arc<str>,
    columns: Arc<[ColumnDescriptor]>,
    values: Vec<Value>,
    index: u64,
}

impl Tuple {
    pub(crate) fn new(
        table: Arc<str>,
        columns: Arc<[ColumnDescriptor]>,
        values: Vec<Value>,
        index: u64,
    ) -> Self {
        Self {
            table,
            columns,
            values,
            index,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Zero-based position of this row within its facet.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn value(&self, name: &str) -> Result<&Value, GenerationError> {
        let position = self.require(name)?;
        Ok(&self.values[position])
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<(), GenerationError> {
        let position = self.require(name)?;
        self.values[position] = value.into();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnDescriptor, &Value)> {
        self.columns.iter().zip(&self.values)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.matches_name(name))
    }

    fn require(&self, name: &str) -> Result<usize, GenerationError> {
        self.position(name)
            .ok_or_else(|| GenerationError::SchemaMismatch {
                table: self.table.to_string(),
                column: name.to_string(),
            })
    }
}
