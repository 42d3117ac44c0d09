#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, Error, Result, Value};
use rowsmith_generate::{InsertStatement, Session};
use rowsmith_introspect::Adapter;

/// In-memory session: tables are column lists, inserted rows are kept per
/// table and split into committed and pending like a real transaction.
pub struct MemorySession {
    identity: String,
    tables: HashMap<String, Vec<ColumnDescriptor>>,
    autocommit: bool,
    batched_keys: bool,
    fail_table: Option<String>,
    next_identity: HashMap<String, i64>,
    pending: Vec<(String, Vec<Value>)>,
    pub committed: HashMap<String, Vec<Vec<Value>>>,
    pub executions: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub loads: usize,
    pub statements: Vec<String>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self {
            identity: "memory://test".to_string(),
            tables: HashMap::new(),
            autocommit: true,
            batched_keys: true,
            fail_table: None,
            next_identity: HashMap::new(),
            pending: Vec::new(),
            committed: HashMap::new(),
            executions: 0,
            commits: 0,
            rollbacks: 0,
            loads: 0,
            statements: Vec::new(),
        }
    }

    pub fn with_table(mut self, name: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables.insert(name.to_lowercase(), columns);
        self
    }

    /// Starts inside a transaction the test itself owns.
    pub fn in_transaction(mut self) -> Self {
        self.autocommit = false;
        self
    }

    pub fn without_batched_keys(mut self) -> Self {
        self.batched_keys = false;
        self
    }

    pub fn failing_on(mut self, table: &str) -> Self {
        self.fail_table = Some(table.to_lowercase());
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Vec<Value>> {
        let mut rows = self.committed.get(table).cloned().unwrap_or_default();
        rows.extend(
            self.pending
                .iter()
                .filter(|(name, _)| name == table)
                .map(|(_, row)| row.clone()),
        );
        rows
    }

    pub fn committed_rows(&self, table: &str) -> usize {
        self.committed.get(table).map_or(0, Vec::len)
    }

    pub fn autocommit_restored(&self) -> bool {
        self.autocommit
    }

    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    fn flush_pending(&mut self) {
        for (table, row) in self.pending.drain(..) {
            self.committed.entry(table).or_default().push(row);
        }
    }
}

#[async_trait]
impl Adapter for MemorySession {
    fn engine(&self) -> &'static str {
        "memory"
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn load_columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.loads += 1;
        Ok(self
            .tables
            .get(&table.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl Session for MemorySession {
    fn supports_batched_keys(&self) -> bool {
        self.batched_keys
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        if enabled && !self.autocommit {
            self.flush_pending();
        }
        self.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        self.flush_pending();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        self.pending.clear();
        Ok(())
    }

    async fn execute_insert(
        &mut self,
        statement: &InsertStatement,
        rows: &[Vec<Value>],
        returning: &[String],
    ) -> Result<Vec<Vec<Value>>> {
        let table = statement.table().to_lowercase();
        if self.fail_table.as_deref() == Some(table.as_str()) {
            return Err(Error::Db(format!("insert into {table} refused")));
        }
        self.executions += 1;
        self.statements.push(statement.render(rows.len(), returning));

        let mut generated = Vec::new();
        for row in rows {
            let keys: Vec<Value> = returning
                .iter()
                .map(|_| {
                    let next = self.next_identity.entry(table.clone()).or_insert(0);
                    *next += 1;
                    Value::Int(*next)
                })
                .collect();
            generated.push(keys);
            self.pending.push((table.clone(), row.clone()));
        }
        if self.autocommit {
            self.flush_pending();
        }
        Ok(generated)
    }
}

pub fn serial(name: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name, "int4", EngineType::Integer)
        .with_property(ColumnProperty::AutoIncrement)
        .with_property(ColumnProperty::DefaultValue)
}

pub fn int(name: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name, "int4", EngineType::Integer)
}

pub fn nullable_text(name: &str, size: u32) -> ColumnDescriptor {
    ColumnDescriptor::new(name, "varchar", EngineType::Varchar)
        .with_size(size)
        .with_property(ColumnProperty::Nullable)
}
