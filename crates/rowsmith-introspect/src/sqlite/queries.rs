use sqlx::SqliteConnection;

use rowsmith_core::Result;

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub position: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: i64,
    pub default_value: Option<String>,
    pub pk: i64,
    pub hidden: i64,
}

const LIST_COLUMNS: &str = r#"
select
  cid as position,
  name,
  coalesce(type, '') as declared_type,
  "notnull" as not_null,
  dflt_value as default_value,
  pk,
  hidden
from pragma_table_xinfo(?1, ?2)
where hidden <> 1
order by cid
"#;

pub async fn list_columns(
    conn: &mut SqliteConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(LIST_COLUMNS)
        .bind(table)
        .bind(schema)
        .fetch_all(conn)
        .await
        .map_err(|err| rowsmith_core::Error::Db(err.to_string()))
}
