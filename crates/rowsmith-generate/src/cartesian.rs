use std::sync::Arc;

use rowsmith_core::Value;
use tracing::debug;

use crate::errors::GenerationError;
use crate::memo::Memo;
use crate::pool::ValuePool;
use crate::supplier::{BoxedSupplier, LazySupplier, RoundRobin};

/// Source of one cartesian column's distinct values.
#[derive(Debug, Clone)]
pub enum Domain {
    Values(Arc<[Value]>),
    Pooled { pool: Arc<ValuePool>, column: String },
}

impl Domain {
    fn resolve(&self) -> Result<Arc<[Value]>, GenerationError> {
        match self {
            Domain::Values(values) => Ok(Arc::clone(values)),
            Domain::Pooled { pool, column } => pool.values(column),
        }
    }
}

#[derive(Debug)]
struct Expansion {
    row_count: u64,
    columns: Vec<Arc<[Value]>>,
}

/// Cross product of several column domains, expanded lazily.
///
/// The first declared column is the outermost loop.
#[derive(Debug, Default)]
pub struct CartesianProduct {
    columns: Vec<(String, Domain)>,
    expansion: Memo<Expansion>,
}

impl CartesianProduct {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|(name, _)| name == column)
    }

    pub fn push(&mut self, column: String, domain: Domain) {
        self.columns.push((column, domain));
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn row_count(&self) -> Result<u64, GenerationError> {
        Ok(self.expand()?.row_count)
    }

    /// Expanded values of one column, one per row.
    pub fn values_of(&self, column: &str) -> Result<Arc<[Value]>, GenerationError> {
        let position = self
            .columns
            .iter()
            .position(|(name, _)| name == column)
            .ok_or_else(|| {
                GenerationError::config(format!("column [{column}] is not part of the product"))
            })?;
        Ok(Arc::clone(&self.expand()?.columns[position]))
    }

    fn expand(&self) -> Result<&Expansion, GenerationError> {
        self.expansion.get_or_try_init(|| {
            let domains = self
                .columns
                .iter()
                .map(|(_, domain)| domain.resolve())
                .collect::<Result<Vec<_>, _>>()?;
            let (row_count, columns) = expand_domains(&domains);
            debug!(
                columns = self.columns.len(),
                rows = row_count,
                "expanded cartesian product"
            );
            Ok(Expansion {
                row_count,
                columns: columns.into_iter().map(Into::into).collect(),
            })
        })
    }
}

/// Supplier reading one column of a shared product, built on first use.
pub fn cartesian_supplier(product: Arc<CartesianProduct>, column: String) -> BoxedSupplier {
    Box::new(LazySupplier::new(move || {
        let values = product.values_of(&column)?;
        Ok(Box::new(RoundRobin::from_shared(values)?) as BoxedSupplier)
    }))
}

/// Expands domains into row-aligned columns.
///
/// Each value of column `i` repeats `block_i` times, where `block_i` is the
/// product of the sizes of every column declared after `i`; the pattern then
/// repeats until the total row count is reached.
pub fn expand_domains(domains: &[Arc<[Value]>]) -> (u64, Vec<Vec<Value>>) {
    let row_count: u64 = domains.iter().map(|domain| domain.len() as u64).product();
    if domains.is_empty() || row_count == 0 {
        return (0, vec![Vec::new(); domains.len()]);
    }

    let mut blocks = vec![1_u64; domains.len()];
    for i in (0..domains.len().saturating_sub(1)).rev() {
        blocks[i] = blocks[i + 1] * domains[i + 1].len() as u64;
    }

    let columns = domains
        .iter()
        .zip(&blocks)
        .map(|(domain, block)| {
            let mut expanded = Vec::with_capacity(row_count as usize);
            while (expanded.len() as u64) < row_count {
                for value in domain.iter() {
                    for _ in 0..*block {
                        expanded.push(value.clone());
                    }
                }
            }
            expanded
        })
        .collect();

    (row_count, columns)
}
