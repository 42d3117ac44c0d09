use std::sync::Arc;

use rowsmith_core::ColumnDescriptor;

use crate::supplier::BoxedSupplier;

use super::{DataSetting, SettingInfo, defaults};

/// Settings consulted in priority order, with the global defaults last.
///
/// Supplier resolution takes the first layer that knows the column; row count
/// and auto-generation policy always come from the first layer.
#[derive(Debug, Clone)]
pub struct LayeredSetting {
    layers: Vec<Arc<DataSetting>>,
}

impl LayeredSetting {
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<DataSetting>>>,
    {
        let mut layers: Vec<Arc<DataSetting>> = layers.into_iter().flatten().collect();
        layers.push(defaults());
        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn primary(&self) -> &DataSetting {
        &self.layers[0]
    }
}

impl SettingInfo for LayeredSetting {
    fn default_rows(&self) -> u64 {
        self.primary().default_rows()
    }

    fn resolve_supplier(&self, column: &ColumnDescriptor) -> Option<BoxedSupplier> {
        self.layers
            .iter()
            .find_map(|layer| layer.resolve_supplier(column))
    }

    fn is_auto_generating(&self, column: &ColumnDescriptor) -> bool {
        self.primary().is_auto_generating(column)
    }
}
