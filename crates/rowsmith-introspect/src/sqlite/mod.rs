use async_trait::async_trait;
use sqlx::SqliteConnection;

use rowsmith_core::{ColumnDescriptor, Result, split_table};

use crate::adapter::Adapter;

mod mapper;
mod queries;

pub use mapper::engine_type_for;

/// Schema searched for tables given without a `schema.` prefix.
pub const MAIN_SCHEMA: &str = "main";

/// Adapter for SQLite over a borrowed connection.
pub struct SqliteAdapter<'c> {
    conn: &'c mut SqliteConnection,
    identity: String,
}

impl<'c> SqliteAdapter<'c> {
    pub fn new(conn: &'c mut SqliteConnection, identity: impl Into<String>) -> Self {
        Self {
            conn,
            identity: identity.into(),
        }
    }
}

#[async_trait]
impl Adapter for SqliteAdapter<'_> {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        load_columns(&mut *self.conn, table).await
    }
}

/// Load the columns of `table`, which may be given as `schema.table` for an
/// attached database.
pub async fn load_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let (schema, name) = split_table(table);
    let schema = schema.unwrap_or_else(|| MAIN_SCHEMA.to_string());
    let raw = queries::list_columns(conn, &schema, &name).await?;
    Ok(mapper::map_columns(raw))
}
