use async_trait::async_trait;
use sqlx::PgConnection;

use rowsmith_core::{ColumnDescriptor, Result};

use crate::adapter::Adapter;
use crate::options::IntrospectOptions;

mod mapper;
mod queries;

pub use mapper::engine_type_for;

/// Adapter for PostgreSQL over a borrowed connection.
///
/// Borrowing lets metadata be read inside a transaction the caller owns.
pub struct PostgresAdapter<'c> {
    conn: &'c mut PgConnection,
    identity: String,
    options: IntrospectOptions,
}

impl<'c> PostgresAdapter<'c> {
    pub fn new(conn: &'c mut PgConnection, identity: impl Into<String>) -> Self {
        Self::with_options(conn, identity, IntrospectOptions::default())
    }

    pub fn with_options(
        conn: &'c mut PgConnection,
        identity: impl Into<String>,
        options: IntrospectOptions,
    ) -> Self {
        Self {
            conn,
            identity: identity.into(),
            options,
        }
    }
}

#[async_trait]
impl Adapter for PostgresAdapter<'_> {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        load_columns(&mut *self.conn, &self.options, table).await
    }
}

/// Load the columns of `table`, which may be given as `schema.table`.
pub async fn load_columns(
    conn: &mut PgConnection,
    options: &IntrospectOptions,
    table: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let (schema, name) = options.qualify(table);
    let raw = queries::list_columns(conn, &schema, &name).await?;
    Ok(mapper::map_columns(raw))
}
