use std::sync::Arc;

use rand::Rng;
use rowsmith_core::Value;
use tracing::{debug, trace};

use crate::errors::GenerationError;
use crate::memo::Memo;
use crate::pool::ValuePool;
use crate::supplier::{BoxedSupplier, LazySupplier, RoundRobin, fresh_rng};

/// How many child rows each parent value produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    min: u32,
    max: u32,
}

impl Cardinality {
    pub fn fixed(per_parent: u32) -> Result<Self, GenerationError> {
        if per_parent == 0 {
            return Err(GenerationError::config(
                "cardinality must be greater than zero",
            ));
        }
        Ok(Self {
            min: per_parent,
            max: per_parent,
        })
    }

    /// A cardinality drawn from `min..=max`. `min` may be zero, `max` may not.
    pub fn between(min: u32, max: u32) -> Result<Self, GenerationError> {
        if max == 0 {
            return Err(GenerationError::config(
                "cardinality max must be greater than zero",
            ));
        }
        if max < min {
            return Err(GenerationError::config(format!(
                "cardinality max [{max}] must be greater than or equal to min [{min}]"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    fn draw(&self, rng: &mut impl Rng) -> u32 {
        if self.is_fixed() {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

/// Repeats each parent value by a drawn cardinality, in parent order.
pub fn expand_with_cardinality(
    parents: &[Value],
    cardinality: Cardinality,
    rng: &mut impl Rng,
) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(parents.len() * cardinality.max as usize);
    for parent in parents {
        let repeat = cardinality.draw(rng);
        trace!(value = %parent, repeat, "expanding parent value");
        expanded.extend(std::iter::repeat_n(parent.clone(), repeat as usize));
    }
    expanded
}

/// A column referencing a parent pool with a per-parent cardinality.
///
/// The expansion is drawn once; the row count and the supplied values both
/// come from that single draw.
#[derive(Debug)]
pub struct Reference {
    pool: Arc<ValuePool>,
    column: String,
    cardinality: Cardinality,
    expanded: Memo<Arc<[Value]>>,
}

impl Reference {
    pub fn new(pool: Arc<ValuePool>, column: String, cardinality: Cardinality) -> Self {
        pool.keep_column(&column);
        Self {
            pool,
            column,
            cardinality,
            expanded: Memo::new(),
        }
    }

    pub fn row_count(&self) -> Result<u64, GenerationError> {
        Ok(self.values()?.len() as u64)
    }

    pub fn values(&self) -> Result<Arc<[Value]>, GenerationError> {
        let expanded = self.expanded.get_or_try_init(|| {
            let parents = self.pool.values(&self.column)?;
            let expanded = expand_with_cardinality(&parents, self.cardinality, &mut fresh_rng());
            debug!(
                table = %self.pool.table(),
                column = %self.column,
                parents = parents.len(),
                rows = expanded.len(),
                "expanded referenced values"
            );
            Ok::<_, GenerationError>(Arc::from(expanded))
        })?;
        Ok(Arc::clone(expanded))
    }
}

pub fn reference_supplier(reference: Arc<Reference>) -> BoxedSupplier {
    Box::new(LazySupplier::new(move || {
        Ok(Box::new(RoundRobin::from_shared(reference.values()?)?) as BoxedSupplier)
    }))
}
