use std::sync::Arc;

use rowsmith_core::{ColumnDescriptor, Value};
use tracing::debug;

use crate::errors::GenerationError;
use crate::facet::TableFacet;
use crate::setting::SettingInfo;
use crate::supplier::BoxedSupplier;
use crate::tuple::Tuple;

/// Produces the rows of one facet over its target columns.
///
/// Every supplier is resolved up front, so a column without one fails
/// before the first row is generated.
pub struct RowGenerator<'f> {
    facet: &'f TableFacet,
    columns: Arc<[ColumnDescriptor]>,
    suppliers: Vec<BoxedSupplier>,
    index: u64,
}

impl<'f> RowGenerator<'f> {
    pub fn new(
        facet: &'f TableFacet,
        columns: Arc<[ColumnDescriptor]>,
        setting: &dyn SettingInfo,
    ) -> Result<Self, GenerationError> {
        let suppliers = columns
            .iter()
            .map(|column| {
                if let Some(supplier) = facet.resolve_supplier(column) {
                    debug!(table = facet.table(), column = %column, "column configured on facet");
                    return Ok(supplier);
                }
                setting
                    .resolve_supplier(column)
                    .ok_or_else(|| GenerationError::Resolution {
                        table: facet.table().to_string(),
                        column: column.name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            facet,
            columns,
            suppliers,
            index: 0,
        })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Rows generated so far.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Generates the next row, runs the facet callback on it and keeps the
    /// pooled values of the facet.
    pub fn next_tuple(&mut self) -> Result<Tuple, GenerationError> {
        let values = self
            .suppliers
            .iter_mut()
            .map(|supplier| supplier.next_value())
            .collect::<Result<Vec<Value>, _>>()?;
        let mut tuple = Tuple::new(
            self.facet.table_arc(),
            Arc::clone(&self.columns),
            values,
            self.index,
        );
        self.facet.on_tuple(&mut tuple)?;
        self.index += 1;

        self.facet
            .pool()
            .preserve_from_pre_insert(tuple.iter().map(|(column, value)| (column.name(), value)));
        Ok(tuple)
    }

    pub fn next_row(&mut self) -> Result<Vec<Value>, GenerationError> {
        Ok(self.next_tuple()?.into_values())
    }
}
