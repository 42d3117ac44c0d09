use sqlx::PgConnection;

use rowsmith_core::Result;

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i16,
    pub name: String,
    pub udt_name: String,
    pub type_category: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub identity_generation: Option<String>,
    pub is_generated: bool,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

const LIST_COLUMNS: &str = r#"
select
  a.attnum as ordinal_position,
  a.attname::text as name,
  t.typname::text as udt_name,
  t.typcategory::text as type_category,
  (not a.attnotnull) as is_nullable,
  pg_get_expr(ad.adbin, ad.adrelid) as "default",
  case
    when a.attidentity = 'a' then 'ALWAYS'
    when a.attidentity = 'd' then 'BY DEFAULT'
    else null
  end as identity_generation,
  (a.attgenerated <> '') as is_generated,
  ic.character_maximum_length::int4 as character_max_length,
  ic.numeric_precision::int4 as numeric_precision,
  ic.numeric_scale::int4 as numeric_scale
from pg_attribute a
join pg_class c on c.oid = a.attrelid
join pg_namespace n on n.oid = c.relnamespace
join pg_type t on t.oid = a.atttypid
left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
left join information_schema.columns ic
  on ic.table_schema = n.nspname and ic.table_name = c.relname and ic.column_name = a.attname
where n.nspname = $1
  and c.relname = $2
  and a.attnum > 0
  and not a.attisdropped
order by a.attnum
"#;

pub async fn list_columns(
    conn: &mut PgConnection,
    schema: &str,
    table: &str,
) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(LIST_COLUMNS)
        .bind(schema)
        .bind(table)
        .fetch_all(conn)
        .await
        .map_err(|err| rowsmith_core::Error::Db(err.to_string()))
}
