//! PostgreSQL session over a borrowed connection.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, Postgres, Row, TypeInfo};
use tracing::trace;
use uuid::Uuid;

use rowsmith_core::{ColumnDescriptor, Error, Result, Value};
use rowsmith_introspect::{Adapter, IntrospectOptions};

use crate::session::Session;
use crate::sql::{InsertStatement, Placeholder};

/// Postgres accepts at most this many bind parameters per statement.
const MAX_BIND_PARAMETERS: usize = 65_535;

const IDENTITY_QUERY: &str = r#"
select
  current_user::text
  || '@' || coalesce(host(inet_server_addr()), 'localhost')
  || ':' || coalesce(inet_server_port()::text, '5432')
  || '/' || current_database()::text
"#;

/// A [`Session`] over one Postgres connection.
///
/// Autocommit is emulated with explicit `BEGIN`/`COMMIT`: leaving autocommit
/// opens a transaction and every commit or rollback opens the next one.
pub struct PgSession<'c> {
    conn: &'c mut PgConnection,
    identity: String,
    options: IntrospectOptions,
    autocommit: bool,
}

impl<'c> PgSession<'c> {
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
            autocommit: true,
        }
    }

    /// Builds a session whose identity is read from the server itself.
    pub async fn discover(conn: &'c mut PgConnection, options: IntrospectOptions) -> Result<Self> {
        let identity = server_identity(&mut *conn).await?;
        Ok(Self::with_options(conn, identity, options))
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

/// `postgres://user@host:port/database` as reported by the server.
pub async fn server_identity(conn: &mut PgConnection) -> Result<String> {
    let identity: String = sqlx::query_scalar(IDENTITY_QUERY)
        .fetch_one(conn)
        .await
        .map_err(|err| Error::Db(err.to_string()))?;
    Ok(format!("postgres://{identity}"))
}

/// Identity of a pool, built from its connect options so no password is
/// ever part of it.
pub fn pool_identity(pool: &PgPool) -> String {
    let options = pool.connect_options();
    let mut identity = format!("postgres://{}@{}", options.get_username(), options.get_host());
    identity.push_str(&format!(":{}", options.get_port()));
    if let Some(database) = options.get_database() {
        identity.push('/');
        identity.push_str(database);
    }
    identity
}

#[async_trait]
impl Adapter for PgSession<'_> {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        rowsmith_introspect::postgres::load_columns(&mut *self.conn, &self.options, table).await
    }
}

#[async_trait]
impl Session for PgSession<'_> {
    fn placeholder(&self) -> Placeholder {
        Placeholder::DollarCast
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
        let width = statement.columns().len();
        let chunk_rows = if width == 0 {
            1
        } else {
            (MAX_BIND_PARAMETERS / width).max(1)
        };

        let mut generated = Vec::with_capacity(if returning.is_empty() { 0 } else { rows.len() });
        for chunk in rows.chunks(chunk_rows) {
            let sql = statement.render(chunk.len(), returning);
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

            if returning.is_empty() {
                query
                    .execute(&mut *self.conn)
                    .await
                    .map_err(|err| Error::Db(err.to_string()))?;
                continue;
            }
            let fetched = query
                .fetch_all(&mut *self.conn)
                .await
                .map_err(|err| Error::Db(err.to_string()))?;
            for row in &fetched {
                generated.push(decode_row(row, returning.len())?);
            }
        }
        Ok(generated)
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    // Placeholders carry a cast to the column type, so nulls bind as text.
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(value) => query.bind(*value),
        Value::Int(value) => query.bind(*value),
        Value::Float(value) => query.bind(*value),
        Value::Decimal(value) => query.bind(*value),
        Value::Text(value) => query.bind(value.clone()),
        Value::Bytes(value) => query.bind(value.clone()),
        Value::Uuid(value) => query.bind(*value),
        Value::Date(value) => query.bind(*value),
        Value::Time(value) => query.bind(*value),
        Value::Timestamp(value) => query.bind(*value),
        Value::TimestampTz(value) => query.bind(*value),
    }
}

fn decode_row(row: &PgRow, width: usize) -> Result<Vec<Value>> {
    (0..width).map(|index| decode_column(row, index)).collect()
}

fn decode_column(row: &PgRow, index: usize) -> Result<Value> {
    let type_name = row.column(index).type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOL" => get::<bool>(row, index)?.map(Value::Bool),
        "INT2" => get::<i16>(row, index)?.map(|value| Value::Int(value.into())),
        "INT4" => get::<i32>(row, index)?.map(|value| Value::Int(value.into())),
        "INT8" => get::<i64>(row, index)?.map(Value::Int),
        "FLOAT4" => get::<f32>(row, index)?.map(|value| Value::Float(value.into())),
        "FLOAT8" => get::<f64>(row, index)?.map(Value::Float),
        "NUMERIC" => get::<Decimal>(row, index)?.map(Value::Decimal),
        "UUID" => get::<Uuid>(row, index)?.map(Value::Uuid),
        "BYTEA" => get::<Vec<u8>>(row, index)?.map(Value::Bytes),
        "DATE" => get::<NaiveDate>(row, index)?.map(Value::Date),
        "TIME" => get::<NaiveTime>(row, index)?.map(Value::Time),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index)?.map(Value::Timestamp),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)?.map(Value::TimestampTz),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => get::<String>(row, index)?.map(Value::Text),
        other => {
            return Err(Error::Unsupported(format!(
                "generated value of type {other} in column {}",
                row.column(index).name()
            )));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn get<T>(row: &PgRow, index: usize) -> Result<Option<T>>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map_err(|err| Error::Db(err.to_string()))
}
