mod common;

use std::sync::Arc;

use anyhow::Result;
use rowsmith_core::{ColumnDescriptor, EngineType, Value};
use rowsmith_generate::{
    ColumnMatcher, DataSetting, GenerationError, Generator, TableFacet, TransactionMode,
};
use rowsmith_introspect::MetadataCache;

use common::{MemorySession, int, nullable_text, serial};

fn generator() -> Generator {
    Generator::new(Arc::new(MetadataCache::new()))
}

fn notes() -> Vec<ColumnDescriptor> {
    vec![nullable_text("title", 12), nullable_text("body", 40)]
}

fn parents_and_children() -> MemorySession {
    MemorySession::new()
        .with_table("parent", vec![serial("id"), nullable_text("name", 10)])
        .with_table(
            "child",
            vec![serial("id"), int("parent_id"), nullable_text("note", 10)],
        )
}

#[tokio::test]
async fn nullable_columns_fill_the_requested_rows() -> Result<()> {
    let mut session = MemorySession::new().with_table("notes", notes());
    let facet = TableFacet::builder("notes").number_of_rows(10).build()?;

    let total = generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&facet])
        .await?;

    assert_eq!(total, 10);
    let rows = session.rows("notes");
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|row| row.len() == 2));
    assert!(
        rows.iter()
            .flatten()
            .all(|value| value.as_str().is_some_and(|text| text.chars().count() <= 40))
    );
    Ok(())
}

#[tokio::test]
async fn child_rows_follow_parent_keys() -> Result<()> {
    let mut session = parents_and_children();
    let parent = TableFacet::builder("parent")
        .key_of_int("id")
        .range(1, 4, 1)
        .build()?;
    let child = TableFacet::builder("child")
        .referencing("parent_id")
        .parent(&parent, "id")
        .cardinality(2)
        .build()?;

    let total = generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&parent, &child])
        .await?;

    assert_eq!(total, 9);
    let parent_ids: Vec<i64> = session
        .rows("child")
        .iter()
        .filter_map(|row| row[0].as_i64())
        .collect();
    assert_eq!(parent_ids, vec![1, 1, 2, 2, 3, 3]);
    Ok(())
}

#[tokio::test]
async fn database_assigned_keys_reach_the_pool() -> Result<()> {
    let mut session = parents_and_children();
    let parent = TableFacet::builder("parent").number_of_rows(3).build()?;
    let child = TableFacet::builder("child")
        .referencing("parent_id")
        .parent(&parent, "id")
        .cardinality(1)
        .build()?;

    let total = generator()
        .with_batch_size(2)
        .generate_with(&mut session, TransactionMode::Owned, &[&parent, &child])
        .await?;

    assert_eq!(total, 6);
    assert!(session.statements[0].ends_with("RETURNING id"));
    assert_eq!(
        parent.pool().values("id")?.as_ref(),
        &[Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    let parent_ids: Vec<i64> = session
        .rows("child")
        .iter()
        .filter_map(|row| row[0].as_i64())
        .collect();
    assert_eq!(parent_ids, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn cartesian_product_expands_every_combination() -> Result<()> {
    let mut session = MemorySession::new().with_table("grid", vec![int("a"), int("b")]);
    let facet = TableFacet::builder("grid")
        .cartesian_product("a")
        .domain([1, 2])
        .cartesian_product("b")
        .domain([1, 2, 3])
        .build()?;

    let total = generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&facet])
        .await?;

    assert_eq!(total, 6);
    let pairs: Vec<(i64, i64)> = session
        .rows("grid")
        .iter()
        .filter_map(|row| Some((row[0].as_i64()?, row[1].as_i64()?)))
        .collect();
    assert_eq!(pairs, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3)]);
    Ok(())
}

#[tokio::test]
async fn facet_setting_overrides_generator_setting() -> Result<()> {
    let mut session = MemorySession::new().with_table("notes", notes());
    let generator = generator().with_setting(
        DataSetting::new()
            .given_type(EngineType::Varchar)
            .use_supplier(|| Value::from("generator")),
    )?;
    let facet = TableFacet::builder("notes")
        .number_of_rows(2)
        .with_setting(
            DataSetting::new()
                .column_matcher(ColumnMatcher::name_is("title"))
                .use_supplier(|| Value::from("facet")),
        )
        .build()?;

    generator
        .generate_with(&mut session, TransactionMode::Owned, &[&facet])
        .await?;

    for row in session.rows("notes") {
        assert_eq!(row, vec![Value::from("facet"), Value::from("generator")]);
    }
    Ok(())
}

#[tokio::test]
async fn tuple_callback_can_rewrite_values() -> Result<()> {
    let mut session = MemorySession::new().with_table("notes", notes());
    let facet = TableFacet::builder("notes")
        .number_of_rows(3)
        .column("title")
        .for_row(|index| Value::from(format!("note-{index}")))
        .on_tuple_generated(|tuple| {
            let title = tuple.value("title")?.as_str().unwrap_or_default().to_uppercase();
            tuple.set_value("BODY", title)
        })
        .build()?;

    generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&facet])
        .await?;

    let bodies: Vec<Value> = session.rows("notes").into_iter().map(|row| row[1].clone()).collect();
    assert_eq!(
        bodies,
        vec![Value::from("NOTE-0"), Value::from("NOTE-1"), Value::from("NOTE-2")]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_configured_column_fails_before_inserting() -> Result<()> {
    let mut session = MemorySession::new().with_table("notes", notes());
    let facet = TableFacet::builder("notes")
        .number_of_rows(1)
        .exclude_columns(&["summary"])
        .build()?;

    let err = generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&facet])
        .await
        .expect_err("unknown column");

    assert!(matches!(
        err,
        GenerationError::SchemaMismatch { ref column, .. } if column == "summary"
    ));
    assert_eq!(session.executions, 0);
    assert_eq!(session.rollbacks, 1);
    Ok(())
}

#[tokio::test]
async fn owned_failure_rolls_back_uncommitted_rows() -> Result<()> {
    let mut session = parents_and_children().failing_on("child");
    let parent = TableFacet::builder("parent").number_of_rows(3).build()?;
    let child = TableFacet::builder("child")
        .referencing("parent_id")
        .parent(&parent, "id")
        .cardinality(1)
        .build()?;

    let result = generator()
        .generate_with(&mut session, TransactionMode::Owned, &[&parent, &child])
        .await;

    assert!(matches!(result, Err(GenerationError::Database(_))));
    assert_eq!(session.rollbacks, 1);
    assert_eq!(session.committed_rows("parent"), 0);
    assert!(session.autocommit_restored());
    Ok(())
}

#[tokio::test]
async fn joined_failure_leaves_the_transaction_to_the_caller() -> Result<()> {
    let mut session = parents_and_children().in_transaction().failing_on("child");
    let parent = TableFacet::builder("parent").number_of_rows(3).build()?;
    let child = TableFacet::builder("child")
        .referencing("parent_id")
        .parent(&parent, "id")
        .cardinality(1)
        .build()?;

    let result = generator()
        .generate_with(&mut session, TransactionMode::Joined, &[&parent, &child])
        .await;

    assert!(result.is_err());
    assert_eq!(session.rollbacks, 0);
    assert_eq!(session.commits, 0);
    assert_eq!(session.pending_rows(), 3);
    Ok(())
}

#[tokio::test]
async fn metadata_is_loaded_once_per_table() -> Result<()> {
    let mut session = MemorySession::new().with_table("notes", notes());
    let generator = generator();
    let first = TableFacet::builder("notes").number_of_rows(1).build()?;
    let second = TableFacet::builder("NOTES").number_of_rows(1).build()?;

    generator
        .generate_with(&mut session, TransactionMode::Owned, &[&first, &second])
        .await?;
    assert_eq!(session.loads, 1);

    generator.cache().clear();
    generator
        .generate_with(&mut session, TransactionMode::Owned, &[&first])
        .await?;
    assert_eq!(session.loads, 2);
    Ok(())
}
