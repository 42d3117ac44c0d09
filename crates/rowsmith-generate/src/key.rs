use std::sync::Arc;

use rowsmith_core::Value;

use crate::errors::GenerationError;
use crate::supplier::ValueSupplier;

/// Declared shape of a bounded integer key sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySequence {
    Stepped { start: i64, count: u64, step: i64 },
    Domain(Arc<[Value]>),
}

impl KeySequence {
    /// `start, start + step, ...` while the value stays before `end`.
    pub fn by_range(start: i64, end: i64, step: i64) -> Result<Self, GenerationError> {
        if step == 0 {
            return Err(GenerationError::config("key step must not be zero"));
        }
        if step > 0 && start >= end {
            return Err(GenerationError::config(format!(
                "key range start [{start}] must be less than end [{end}] for a positive step"
            )));
        }
        if step < 0 && start <= end {
            return Err(GenerationError::config(format!(
                "key range start [{start}] must be greater than end [{end}] for a negative step"
            )));
        }
        let span = i128::from(end) - i128::from(start);
        let count = u64::try_from(span / i128::from(step))
            .map_err(|_| GenerationError::config("key range is too large"))?;
        Ok(KeySequence::Stepped { start, count, step })
    }

    pub fn by_limit(start: i64, count: u64, step: i64) -> Result<Self, GenerationError> {
        if count == 0 {
            return Err(GenerationError::config("key limit must be greater than zero"));
        }
        if step == 0 {
            return Err(GenerationError::config("key step must not be zero"));
        }
        Ok(KeySequence::Stepped { start, count, step })
    }

    pub fn by_domain<I, V>(values: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(GenerationError::config("key domain must not be empty"));
        }
        Ok(KeySequence::Domain(values.into()))
    }

    /// Number of values the sequence yields, which is also the row count it drives.
    pub fn count(&self) -> u64 {
        match self {
            KeySequence::Stepped { count, .. } => *count,
            KeySequence::Domain(values) => values.len() as u64,
        }
    }

    pub fn supplier(&self) -> KeySequenceSupplier {
        KeySequenceSupplier {
            sequence: self.clone(),
            produced: 0,
        }
    }
}

/// Stateful supplier walking a [`KeySequence`]; errors once it runs out.
#[derive(Debug, Clone)]
pub struct KeySequenceSupplier {
    sequence: KeySequence,
    produced: u64,
}

impl KeySequenceSupplier {
    pub fn by_range(start: i64, end: i64, step: i64) -> Result<Self, GenerationError> {
        Ok(KeySequence::by_range(start, end, step)?.supplier())
    }

    pub fn by_limit(start: i64, count: u64, step: i64) -> Result<Self, GenerationError> {
        Ok(KeySequence::by_limit(start, count, step)?.supplier())
    }

    pub fn by_domain<I, V>(values: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Ok(KeySequence::by_domain(values)?.supplier())
    }

    pub fn count(&self) -> u64 {
        self.sequence.count()
    }

    pub fn remaining(&self) -> u64 {
        self.count().saturating_sub(self.produced)
    }
}

impl ValueSupplier for KeySequenceSupplier {
    fn next_value(&mut self) -> Result<Value, GenerationError> {
        if self.produced >= self.sequence.count() {
            return Err(GenerationError::Exhausted(format!(
                "key sequence declared {} values",
                self.sequence.count()
            )));
        }
        let value = match &self.sequence {
            KeySequence::Stepped { start, step, .. } => {
                let offset = i128::from(*step) * i128::from(self.produced);
                let value = i64::try_from(i128::from(*start) + offset).map_err(|_| {
                    GenerationError::Exhausted("key sequence overflowed i64".to_string())
                })?;
                Value::Int(value)
            }
            KeySequence::Domain(values) => values[self.produced as usize].clone(),
        };
        self.produced += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(supplier: &mut KeySequenceSupplier) -> Vec<i64> {
        (0..supplier.count())
            .map(|_| {
                supplier
                    .next_value()
                    .expect("value")
                    .as_i64()
                    .expect("int")
            })
            .collect()
    }

    #[test]
    fn range_yields_values_then_exhausts() {
        let mut supplier = KeySequenceSupplier::by_range(1, 6, 1).expect("range");
        assert_eq!(drain(&mut supplier), vec![1, 2, 3, 4, 5]);
        let err = supplier.next_value().expect_err("exhausted");
        assert!(matches!(err, GenerationError::Exhausted(_)));
    }

    #[test]
    fn range_count_floors_partial_steps() {
        let supplier = KeySequenceSupplier::by_range(0, 10, 3).expect("range");
        assert_eq!(supplier.count(), 3);
    }

    #[test]
    fn negative_step_counts_down() {
        let mut supplier = KeySequenceSupplier::by_range(10, 4, -2).expect("range");
        assert_eq!(drain(&mut supplier), vec![10, 8, 6]);
    }

    #[test]
    fn limit_uses_given_count() {
        let mut supplier = KeySequenceSupplier::by_limit(100, 3, 10).expect("limit");
        assert_eq!(drain(&mut supplier), vec![100, 110, 120]);
        assert_eq!(supplier.remaining(), 0);
    }

    #[test]
    fn domain_consumes_values_in_order() {
        let mut supplier = KeySequenceSupplier::by_domain([7, 3, 9]).expect("domain");
        assert_eq!(drain(&mut supplier), vec![7, 3, 9]);
        assert!(supplier.next_value().is_err());
    }

    #[test]
    fn rejects_invalid_ranges() {
        assert!(KeySequence::by_range(1, 6, 0).is_err());
        assert!(KeySequence::by_range(6, 1, 1).is_err());
        assert!(KeySequence::by_range(1, 6, -1).is_err());
        assert!(KeySequence::by_limit(1, 0, 1).is_err());
        assert!(KeySequence::by_domain(Vec::<i64>::new()).is_err());
    }
}
