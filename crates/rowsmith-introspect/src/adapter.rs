use async_trait::async_trait;

use rowsmith_core::{ColumnDescriptor, Result};

/// Trait implemented by connections that can describe the columns of a table.
#[async_trait]
pub trait Adapter: Send {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Identity of the underlying database, used to key cached metadata.
    ///
    /// Must not contain credentials.
    fn identity(&self) -> &str;

    /// Load the columns of `table` in declaration order.
    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>>;
}
