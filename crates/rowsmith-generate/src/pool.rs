use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use rowsmith_core::Value;
use tracing::trace;

use crate::errors::GenerationError;

#[derive(Debug, Default)]
struct PoolState {
    kept: HashSet<String>,
    values: HashMap<String, Vec<Value>>,
    pre_insert_sourced: HashSet<String>,
}

/// Values of one table's kept columns, shared with facets referencing it.
///
/// Values arrive in two phases: explicitly generated values before insert,
/// and database-assigned values (identity, defaults) after insert. A column
/// fed by the first phase ignores the second.
#[derive(Debug)]
pub struct ValuePool {
    table: String,
    state: Mutex<PoolState>,
}

impl ValuePool {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Registers interest in a column; repeated calls are no-ops.
    pub fn keep_column(&self, name: &str) {
        let mut state = self.lock();
        state.kept.insert(name.trim().to_lowercase());
    }

    pub fn is_kept(&self, name: &str) -> bool {
        self.lock().kept.contains(&name.trim().to_lowercase())
    }

    pub fn has_kept_columns(&self) -> bool {
        !self.lock().kept.is_empty()
    }

    /// Records the values of one generated row, before it is inserted.
    pub fn preserve_from_pre_insert<'a, I>(&self, row: I)
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let mut state = self.lock();
        if state.kept.is_empty() {
            return;
        }
        for (name, value) in row {
            let key = name.to_lowercase();
            if !state.kept.contains(&key) {
                continue;
            }
            state.values.entry(key.clone()).or_default().push(value.clone());
            state.pre_insert_sourced.insert(key);
        }
    }

    /// Records values returned by the database for one executed batch.
    ///
    /// `names` labels the positions of every row in `rows`.
    pub fn preserve_from_post_insert(&self, names: &[String], rows: &[Vec<Value>]) {
        let mut state = self.lock();
        for (position, name) in names.iter().enumerate() {
            let key = name.to_lowercase();
            if !state.kept.contains(&key) || state.pre_insert_sourced.contains(&key) {
                continue;
            }
            let column_values = state.values.entry(key).or_default();
            column_values.extend(rows.iter().filter_map(|row| row.get(position).cloned()));
        }
        trace!(table = %self.table, rows = rows.len(), "preserved generated values");
    }

    /// Values of a kept column, in generation order.
    pub fn values(&self, name: &str) -> Result<Arc<[Value]>, GenerationError> {
        let key = name.trim().to_lowercase();
        let state = self.lock();
        if !state.kept.contains(&key) {
            return Err(GenerationError::ValuePool(format!(
                "column [{}.{key}] is not kept for referencing",
                self.table
            )));
        }
        match state.values.get(&key) {
            Some(values) if !values.is_empty() => Ok(values.as_slice().into()),
            _ => Err(GenerationError::ValuePool(format!(
                "no values for [{}.{key}]; is the referenced table generated before this one?",
                self.table
            ))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(pairs: &'a [(&'a str, Value)]) -> impl Iterator<Item = (&'a str, &'a Value)> {
        pairs.iter().map(|(name, value)| (*name, value))
    }

    #[test]
    fn pre_insert_values_block_post_insert_values() {
        let pool = ValuePool::new("orders");
        pool.keep_column("x");
        pool.keep_column("X");

        pool.preserve_from_pre_insert(row(&[("x", Value::Int(1)), ("y", Value::Int(10))]));
        pool.preserve_from_pre_insert(row(&[("x", Value::Int(2)), ("y", Value::Int(20))]));
        pool.preserve_from_post_insert(&["x".to_string()], &[vec![Value::Int(99)]]);

        let values = pool.values("x").expect("values");
        assert_eq!(values.as_ref(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn post_insert_feeds_columns_without_explicit_values() {
        let pool = ValuePool::new("users");
        pool.keep_column("id");
        pool.preserve_from_pre_insert(row(&[("name", Value::from("a"))]));
        pool.preserve_from_post_insert(
            &["id".to_string()],
            &[vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let values = pool.values("ID").expect("values");
        assert_eq!(values.as_ref(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn reading_unkept_or_empty_columns_fails() {
        let pool = ValuePool::new("users");
        let unkept = pool.values("id").expect_err("unkept");
        assert!(matches!(unkept, GenerationError::ValuePool(_)));

        pool.keep_column("id");
        let empty = pool.values("id").expect_err("empty");
        assert!(empty.to_string().contains("generated before"));
    }
}
