use anyhow::Result;
use rowsmith_core::{ColumnProperty, EngineType};
use rowsmith_introspect::{MetadataCache, SqliteAdapter};
use sqlx::{Connection, SqliteConnection};

const FIXTURE: &str = "create table Invoice (
    id integer primary key,
    code text not null,
    amount decimal(10, 2) default 0,
    issued_on date,
    total integer generated always as (amount * 100) virtual
)";

#[tokio::test]
async fn loads_and_caches_sqlite_columns() -> Result<()> {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
    sqlx::query(FIXTURE).execute(&mut conn).await?;

    let cache = MetadataCache::new();
    let mut adapter = SqliteAdapter::new(&mut conn, "sqlite::memory:");
    let columns = cache.columns(&mut adapter, "INVOICE").await?;

    let names: Vec<&str> = columns.iter().map(|col| col.name()).collect();
    assert_eq!(names, vec!["id", "code", "amount", "issued_on", "total"]);
    assert!(columns[0].has_property(ColumnProperty::AutoIncrement));
    assert!(!columns[1].is_nullable());
    assert_eq!(columns[1].engine_type(), EngineType::Varchar);
    assert_eq!(columns[2].decimal_digits(), Some(2));
    assert!(columns[2].has_property(ColumnProperty::DefaultValue));
    assert_eq!(columns[3].engine_type(), EngineType::Date);
    assert!(columns[4].has_property(ColumnProperty::Generated));
    assert!(cache.get("sqlite::memory:", "invoice").is_some());
    Ok(())
}

#[tokio::test]
async fn missing_table_has_no_columns() -> Result<()> {
    let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
    let mut adapter = SqliteAdapter::new(&mut conn, "sqlite::memory:");
    let cache = MetadataCache::new();
    assert!(cache.columns(&mut adapter, "nowhere").await.is_err());
    Ok(())
}
