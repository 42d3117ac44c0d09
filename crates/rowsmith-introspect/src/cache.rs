use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use rowsmith_core::{ColumnDescriptor, Error, Result, normalize_table};
use tracing::debug;

use crate::adapter::Adapter;

type CacheKey = (String, String);

/// Column metadata cached per (connection identity, table).
///
/// Tables are keyed by their folded name, the same name adapters look up in
/// the catalog, so `Orders` and `orders` share one entry.
///
/// The cache is shared across threads; concurrent loads of the same table
/// are allowed and the last writer wins, since the loaded metadata is the
/// same either way.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<CacheKey, Arc<[ColumnDescriptor]>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached columns, loading them through `adapter` on a miss.
    pub async fn columns<A>(&self, adapter: &mut A, table: &str) -> Result<Arc<[ColumnDescriptor]>>
    where
        A: Adapter + ?Sized,
    {
        if let Some(columns) = self.get(adapter.identity(), table) {
            return Ok(columns);
        }

        let loaded = adapter.load_columns(table).await?;
        if loaded.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "no column metadata found for table {table}"
            )));
        }
        debug!(
            engine = adapter.engine(),
            table = %table,
            columns = loaded.len(),
            "loaded column metadata"
        );

        let columns: Arc<[ColumnDescriptor]> = loaded.into();
        self.insert(adapter.identity(), table, Arc::clone(&columns));
        Ok(columns)
    }

    pub fn get(&self, identity: &str, table: &str) -> Option<Arc<[ColumnDescriptor]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&cache_key(identity, table)).cloned()
    }

    pub fn insert(&self, identity: &str, table: &str, columns: Arc<[ColumnDescriptor]>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(cache_key(identity, table), columns);
    }

    /// Drops one table so the next lookup reloads it.
    pub fn invalidate(&self, identity: &str, table: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&cache_key(identity, table)).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(identity: &str, table: &str) -> CacheKey {
    (identity.to_string(), normalize_table(table))
}
