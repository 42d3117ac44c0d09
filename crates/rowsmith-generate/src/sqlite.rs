//! SQLite session over a borrowed connection.
//!
//! Generated keys come from `last_insert_rowid()`, which only describes the
//! last row of an execution, so this session never reports batched keys and
//! the writer drives it one row at a time whenever keys are wanted.

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqliteConnection};
use tracing::trace;

use rowsmith_core::{ColumnDescriptor, Error, Result, Value};
use rowsmith_introspect::Adapter;

use crate::session::Session;
use crate::sql::{InsertStatement, Placeholder};

/// Default `SQLITE_MAX_VARIABLE_NUMBER` since SQLite 3.32.
const MAX_BIND_PARAMETERS: usize = 32_766;

/// A [`Session`] over one SQLite connection, e.g. `sqlite::memory:`.
///
/// Autocommit is emulated the same way as for Postgres: leaving autocommit
/// opens a transaction and every commit or rollback opens the next one.
pub struct SqliteSession<'c> {
    conn: &'c mut SqliteConnection,
    identity: String,
    autocommit: bool,
}

impl<'c> SqliteSession<'c> {
    pub fn new(conn: &'c mut SqliteConnection, identity: impl Into<String>) -> Self {
        Self {
            conn,
            identity: identity.into(),
            autocommit: true,
        }
    }

    async fn run(&mut self, sql: &'static str) -> Result<()> {
        trace!(sql, "session statement");
        sqlx::query(sql)
            .execute(&mut *self.conn)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for SqliteSession<'_> {
    fn engine(&self) -> &'static str {
        "sqlite"
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        rowsmith_introspect::sqlite::load_columns(&mut *self.conn, table).await
    }
}

#[async_trait]
impl Session for SqliteSession<'_> {
    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    fn supports_batched_keys(&self) -> bool {
        false
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.autocommit {
            return Ok(());
        }
        if enabled {
            self.run("COMMIT").await?;
        } else {
            self.run("BEGIN").await?;
        }
        self.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.autocommit {
            return Ok(());
        }
        self.run("COMMIT").await?;
        self.run("BEGIN").await
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.autocommit {
            return Ok(());
        }
        self.run("ROLLBACK").await?;
        self.run("BEGIN").await
    }

    async fn execute_insert(
        &mut self,
        statement: &InsertStatement,
        rows: &[Vec<Value>],
        returning: &[String],
    ) -> Result<Vec<Vec<Value>>> {
        if returning.len() > 1 {
            return Err(Error::Unsupported(format!(
                "sqlite returns only the rowid, asked for {} columns of table {}",
                returning.len(),
                statement.table()
            )));
        }
        let width = statement.columns().len();
        let chunk_rows = if width == 0 || !returning.is_empty() {
            1
        } else {
            (MAX_BIND_PARAMETERS / width).max(1)
        };

        let mut generated = Vec::with_capacity(if returning.is_empty() { 0 } else { rows.len() });
        for chunk in rows.chunks(chunk_rows) {
            let sql = statement.render(chunk.len(), &[]);
            let mut query = sqlx::query(&sql);
            for row in chunk {
                if row.len() != width {
                    return Err(Error::InvalidSchema(format!(
                        "row of {} values for {} columns of table {}",
                        row.len(),
                        width,
                        statement.table()
                    )));
                }
                for value in row {
                    query = bind_value(query, value);
                }
            }

            let result = query
                .execute(&mut *self.conn)
                .await
                .map_err(|err| Error::Db(err.to_string()))?;
            if !returning.is_empty() {
                generated.push(vec![Value::Int(result.last_insert_rowid())]);
            }
        }
        Ok(generated)
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    // Decimals and UUIDs are stored as text.
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(value) => query.bind(*value),
        Value::Int(value) => query.bind(*value),
        Value::Float(value) => query.bind(*value),
        Value::Decimal(value) => query.bind(value.to_string()),
        Value::Text(value) => query.bind(value.clone()),
        Value::Bytes(value) => query.bind(value.clone()),
        Value::Uuid(value) => query.bind(value.hyphenated().to_string()),
        Value::Date(value) => query.bind(*value),
        Value::Time(value) => query.bind(*value),
        Value::Timestamp(value) => query.bind(*value),
        Value::TimestampTz(value) => query.bind(*value),
    }
}
