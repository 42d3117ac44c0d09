//! Table facets: what rows to generate for one table and how many.

mod builder;
mod steps;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rowsmith_core::ColumnDescriptor;

use crate::cardinality::Reference;
use crate::cartesian::CartesianProduct;
use crate::errors::GenerationError;
use crate::key::KeySequence;
use crate::pool::ValuePool;
use crate::setting::{DataSetting, SettingInfo};
use crate::supplier::{BoxedSupplier, SupplierDecider};
use crate::tuple::Tuple;

pub use builder::FacetBuilder;
pub use steps::{CardinalityStep, CartesianStep, ColumnStep, FromStep, KeyStep, ReferenceStep};

pub(crate) type TupleCallback =
    Arc<dyn Fn(&mut Tuple) -> Result<(), GenerationError> + Send + Sync>;

/// Where the number of rows of a facet comes from.
#[derive(Debug, Clone)]
pub(crate) enum RowSource {
    Fixed(u64),
    Key(KeySequence),
    Cartesian(Arc<CartesianProduct>),
    Reference(Arc<Reference>),
}

impl RowSource {
    fn label(&self) -> &'static str {
        match self {
            RowSource::Fixed(_) => "number of rows",
            RowSource::Key(_) => "key column",
            RowSource::Cartesian(_) => "cartesian product",
            RowSource::Reference(_) => "referencing cardinality",
        }
    }
}

/// Whether a column takes part in the insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnInclusion {
    Include,
    Exclude,
    /// Left to the auto-generation policy of the settings.
    NotSet,
}

/// Declarative description of the rows generated for one table.
///
/// A facet owns the value pool other facets reference, so it is tied to a
/// single generation pass.
pub struct TableFacet {
    table: Arc<str>,
    row_source: Option<RowSource>,
    columns: Vec<(String, SupplierDecider)>,
    inclusion: BTreeSet<String>,
    exclusion: BTreeSet<String>,
    callback: Option<TupleCallback>,
    setting: Option<Arc<DataSetting>>,
    pool: Arc<ValuePool>,
}

impl TableFacet {
    pub fn builder(table: &str) -> FacetBuilder {
        FacetBuilder::new(table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub(crate) fn table_arc(&self) -> Arc<str> {
        Arc::clone(&self.table)
    }

    pub fn pool(&self) -> &Arc<ValuePool> {
        &self.pool
    }

    pub fn setting(&self) -> Option<&Arc<DataSetting>> {
        self.setting.as_ref()
    }

    /// Number of rows to generate; falls back to the settings' default.
    pub fn row_count(&self, setting: &dyn SettingInfo) -> Result<u64, GenerationError> {
        match &self.row_source {
            Some(RowSource::Fixed(rows)) => Ok(*rows),
            Some(RowSource::Key(sequence)) => Ok(sequence.count()),
            Some(RowSource::Cartesian(product)) => product.row_count(),
            Some(RowSource::Reference(reference)) => reference.row_count(),
            None => Ok(setting.default_rows()),
        }
    }

    /// Supplier explicitly configured on this facet for `column`.
    pub fn resolve_supplier(&self, column: &ColumnDescriptor) -> Option<BoxedSupplier> {
        let key = column.key();
        self.columns
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, decide)| decide(column))
    }

    pub fn column_inclusion(&self, column: &ColumnDescriptor) -> ColumnInclusion {
        let key = column.key();
        if self.columns.iter().any(|(name, _)| *name == key) {
            return ColumnInclusion::Include;
        }
        if !self.inclusion.is_empty() {
            return if self.inclusion.contains(&key) {
                ColumnInclusion::Include
            } else {
                ColumnInclusion::Exclude
            };
        }
        if self.exclusion.contains(&key) {
            return ColumnInclusion::Exclude;
        }
        ColumnInclusion::NotSet
    }

    /// Every column name mentioned by configuration, lowercased.
    pub fn configured_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.inclusion.iter().map(String::as_str))
            .chain(self.exclusion.iter().map(String::as_str))
            .collect()
    }

    pub(crate) fn on_tuple(&self, tuple: &mut Tuple) -> Result<(), GenerationError> {
        match &self.callback {
            Some(callback) => callback(tuple),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TableFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFacet")
            .field("table", &self.table)
            .field(
                "row_source",
                &self.row_source.as_ref().map(RowSource::label),
            )
            .field(
                "columns",
                &self.columns.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("inclusion", &self.inclusion)
            .field("exclusion", &self.exclusion)
            .field("callback", &self.callback.is_some())
            .field("setting", &self.setting)
            .finish()
    }
}
