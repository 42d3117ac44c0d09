//! Value suppliers and the combinators facets and settings build on.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rowsmith_core::{ColumnDescriptor, Value};

use crate::errors::GenerationError;

/// Produces one value per call.
///
/// Suppliers are stateful; a bounded supplier reports exhaustion as an error
/// instead of wrapping around.
pub trait ValueSupplier: Send {
    fn next_value(&mut self) -> Result<Value, GenerationError>;
}

impl<F> ValueSupplier for F
where
    F: FnMut() -> Value + Send,
{
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        Ok(self())
    }
}

pub type BoxedSupplier = Box<dyn ValueSupplier>;

/// Chooses a supplier once the column it feeds is known.
pub type SupplierDecider = Arc<dyn Fn(&ColumnDescriptor) -> BoxedSupplier + Send + Sync>;

pub fn decider<F>(decide: F) -> SupplierDecider
where
    F: Fn(&ColumnDescriptor) -> BoxedSupplier + Send + Sync + 'static,
{
    Arc::new(decide)
}

pub(crate) fn fresh_rng() -> ChaCha8Rng {
    ChaCha8Rng::from_rng(&mut rand::rng())
}

/// Supplier that always yields the same value.
pub fn fixed(value: impl Into<Value>) -> impl ValueSupplier + Clone {
    let value = value.into();
    move || value.clone()
}

/// Cycles through a list of values, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    values: Arc<[Value]>,
    cursor: usize,
}

impl RoundRobin {
    pub fn new<I, V>(values: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::from_shared(values.into())
    }

    pub(crate) fn from_shared(values: Arc<[Value]>) -> Result<Self, GenerationError> {
        if values.is_empty() {
            return Err(GenerationError::config(
                "round-robin supplier requires at least one value",
            ));
        }
        Ok(Self { values, cursor: 0 })
    }
}

impl ValueSupplier for RoundRobin {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        let value = self.values[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.values.len();
        Ok(value)
    }
}

/// Draws uniformly from a list of values on every call.
#[derive(Debug, Clone)]
pub struct RandomPick {
    values: Arc<[Value]>,
    rng: ChaCha8Rng,
}

impl RandomPick {
    pub(crate) fn from_shared(values: Arc<[Value]>) -> Result<Self, GenerationError> {
        if values.is_empty() {
            return Err(GenerationError::config(
                "random supplier requires at least one value",
            ));
        }
        Ok(Self {
            values,
            rng: fresh_rng(),
        })
    }
}

impl ValueSupplier for RandomPick {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        let idx = self.rng.random_range(0..self.values.len());
        Ok(self.values[idx].clone())
    }
}

/// Feeds a zero-based row counter to a function.
pub struct RowIndexSupplier<F> {
    index: u64,
    to_value: F,
}

impl<F> RowIndexSupplier<F> {
    pub fn new(to_value: F) -> Self {
        Self { index: 0, to_value }
    }
}

impl<F> ValueSupplier for RowIndexSupplier<F>
where
    F: FnMut(u64) -> Value + Send,
{
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        let value = (self.to_value)(self.index);
        self.index += 1;
        Ok(value)
    }
}

type SupplierInit = Box<dyn FnOnce() -> Result<BoxedSupplier, GenerationError> + Send>;

/// Builds the real supplier on the first call.
///
/// Used where the values only exist once a referenced facet has been
/// generated.
pub struct LazySupplier {
    init: Option<SupplierInit>,
    inner: Option<BoxedSupplier>,
}

impl LazySupplier {
    pub fn new<F>(init: F) -> Self
    where
        F: FnOnce() -> Result<BoxedSupplier, GenerationError> + Send + 'static,
    {
        Self {
            init: Some(Box::new(init)),
            inner: None,
        }
    }
}

impl ValueSupplier for LazySupplier {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        if self.inner.is_none() {
            let init = self.init.take().ok_or_else(|| {
                GenerationError::ValuePool("lazy supplier failed to initialize earlier".to_string())
            })?;
            self.inner = Some(init()?);
        }
        match self.inner.as_mut() {
            Some(inner) => inner.next_value(),
            None => Err(GenerationError::ValuePool(
                "lazy supplier is not initialized".to_string(),
            )),
        }
    }
}

/// Returns null on a roll of one, otherwise delegates.
pub struct NullDice {
    inner: BoxedSupplier,
    sides: u32,
    rng: ChaCha8Rng,
}

impl NullDice {
    pub fn new(inner: BoxedSupplier, sides: u32) -> Self {
        Self {
            inner,
            sides: sides.max(1),
            rng: fresh_rng(),
        }
    }
}

impl ValueSupplier for NullDice {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        if self.rng.random_range(1..=self.sides) == 1 {
            return Ok(Value::Null);
        }
        self.inner.next_value()
    }
}

/// One stateful supplier shared by every column and run it is handed to.
#[derive(Clone)]
pub struct SharedSupplier {
    inner: Arc<Mutex<BoxedSupplier>>,
}

impl SharedSupplier {
    pub fn new(supplier: impl ValueSupplier + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(supplier))),
        }
    }
}

impl fmt::Debug for SharedSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSupplier").finish_non_exhaustive()
    }
}

impl ValueSupplier for SharedSupplier {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_value()
    }
}

/// Unbounded integer sequence.
#[derive(Debug, Clone)]
pub struct Sequence {
    next: i64,
    step: i64,
}

impl Sequence {
    pub fn new(start: i64, step: i64) -> Self {
        Self { next: start, step }
    }

    /// The value the next call will return.
    pub fn last_value(&self) -> i64 {
        self.next
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl ValueSupplier for Sequence {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        let value = self.next;
        self.next = self.next.checked_add(self.step).ok_or_else(|| {
            GenerationError::Exhausted(format!("sequence overflowed after {value}"))
        })?;
        Ok(Value::Int(value))
    }
}
