use async_trait::async_trait;
use rowsmith_core::{Result, Value};
use rowsmith_introspect::Adapter;

use crate::sql::{InsertStatement, Placeholder};

/// A live connection the writer inserts through.
///
/// Transaction control is explicit: the writer only calls `set_autocommit`,
/// `commit` and `rollback` when it owns the connection.
#[async_trait]
pub trait Session: Adapter {
    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    /// Whether one execution of many rows can return the generated values of
    /// every row. Sessions answering `false` are driven one row at a time.
    fn supports_batched_keys(&self) -> bool {
        true
    }

    fn autocommit(&self) -> bool;

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Inserts `rows` with `statement`.
    ///
    /// When `returning` is not empty, returns one row per inserted row with
    /// the values of those columns, in insert order and in the order of
    /// `returning`.
    async fn execute_insert(
        &mut self,
        statement: &InsertStatement,
        rows: &[Vec<Value>],
        returning: &[String],
    ) -> Result<Vec<Vec<Value>>>;
}
