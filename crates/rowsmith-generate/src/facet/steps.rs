//! Second-stage builders returned while configuring a facet column.

use std::sync::Arc;

use fake::{Dummy, Fake};
use rowsmith_core::Value;

use crate::cardinality::{Cardinality, Reference, reference_supplier};
use crate::cartesian::Domain;
use crate::errors::GenerationError;
use crate::key::KeySequence;
use crate::pool::ValuePool;
use crate::supplier::{
    BoxedSupplier, LazySupplier, RandomPick, RoundRobin, RowIndexSupplier, SharedSupplier,
    ValueSupplier, decider, fixed, fresh_rng,
};

use super::builder::FacetBuilder;
use super::{RowSource, TableFacet};

/// Configures the key column that drives the row count.
pub struct KeyStep {
    builder: FacetBuilder,
    column: String,
}

impl KeyStep {
    pub(super) fn new(builder: FacetBuilder, column: String) -> Self {
        Self { builder, column }
    }

    /// `start, start + step, ...` while before `end`.
    pub fn range(self, start: i64, end: i64, step: i64) -> FacetBuilder {
        self.apply(KeySequence::by_range(start, end, step))
    }

    pub fn limit(self, start: i64, count: u64, step: i64) -> FacetBuilder {
        self.apply(KeySequence::by_limit(start, count, step))
    }

    pub fn domain<I, V>(self, values: I) -> FacetBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.apply(KeySequence::by_domain(values))
    }

    fn apply(self, sequence: Result<KeySequence, GenerationError>) -> FacetBuilder {
        let KeyStep {
            mut builder,
            column,
        } = self;
        match sequence {
            Ok(sequence) => {
                builder.set_row_source(RowSource::Key(sequence.clone()));
                builder.put_column(
                    column,
                    decider(move |_| Box::new(sequence.supplier()) as BoxedSupplier),
                );
            }
            Err(err) => builder.record(err),
        }
        builder
    }
}

/// Declares the domain of one cartesian product column.
pub struct CartesianStep {
    builder: FacetBuilder,
    column: String,
}

impl CartesianStep {
    pub(super) fn new(builder: FacetBuilder, column: String) -> Self {
        Self { builder, column }
    }

    pub fn domain<I, V>(self, values: I) -> FacetBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let CartesianStep {
            mut builder,
            column,
        } = self;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            builder.record(GenerationError::config(format!(
                "cartesian domain of column [{column}] must not be empty"
            )));
            return builder;
        }
        builder.put_cartesian(column, Domain::Values(values.into()));
        builder
    }

    /// Uses the values another facet generates for `column` as the domain.
    pub fn referencing(self, facet: &TableFacet, column: &str) -> FacetBuilder {
        let CartesianStep {
            mut builder,
            column: own,
        } = self;
        let Some(referenced) = referenced_column(&mut builder, column) else {
            return builder;
        };
        let pool = Arc::clone(facet.pool());
        pool.keep_column(&referenced);
        builder.put_cartesian(
            own,
            Domain::Pooled {
                pool,
                column: referenced,
            },
        );
        builder
    }
}

/// Picks the parent facet of a referencing column.
pub struct ReferenceStep {
    builder: FacetBuilder,
    column: String,
}

impl ReferenceStep {
    pub(super) fn new(builder: FacetBuilder, column: String) -> Self {
        Self { builder, column }
    }

    pub fn parent(self, facet: &TableFacet, column: &str) -> CardinalityStep {
        let ReferenceStep {
            mut builder,
            column: own,
        } = self;
        let parent_column = referenced_column(&mut builder, column).unwrap_or_default();
        CardinalityStep {
            builder,
            column: own,
            pool: Arc::clone(facet.pool()),
            parent_column,
        }
    }
}

/// Sets how many child rows each parent value produces.
pub struct CardinalityStep {
    builder: FacetBuilder,
    column: String,
    pool: Arc<ValuePool>,
    parent_column: String,
}

impl CardinalityStep {
    pub fn cardinality(self, per_parent: u32) -> FacetBuilder {
        self.apply(Cardinality::fixed(per_parent))
    }

    /// Draws a count in `min..=max` for every parent value.
    pub fn cardinality_between(self, min: u32, max: u32) -> FacetBuilder {
        self.apply(Cardinality::between(min, max))
    }

    fn apply(self, cardinality: Result<Cardinality, GenerationError>) -> FacetBuilder {
        let CardinalityStep {
            mut builder,
            column,
            pool,
            parent_column,
        } = self;
        let cardinality = match cardinality {
            Ok(cardinality) => cardinality,
            Err(err) => {
                builder.record(err);
                return builder;
            }
        };
        if parent_column.is_empty() {
            return builder;
        }
        let reference = Arc::new(Reference::new(pool, parent_column, cardinality));
        builder.set_row_source(RowSource::Reference(Arc::clone(&reference)));
        builder.put_column(
            column,
            decider(move |_| reference_supplier(Arc::clone(&reference))),
        );
        builder
    }
}

/// Configures the supplier of one column.
pub struct ColumnStep {
    builder: FacetBuilder,
    column: String,
}

impl ColumnStep {
    pub(super) fn new(builder: FacetBuilder, column: String) -> Self {
        Self { builder, column }
    }

    pub fn fixed(self, value: impl Into<Value>) -> FacetBuilder {
        let value = value.into();
        self.decide_supplier(move |_| Box::new(fixed(value.clone())))
    }

    /// One supplier instance, shared by every row of the facet.
    pub fn use_supplier(self, supplier: impl ValueSupplier + 'static) -> FacetBuilder {
        let shared = SharedSupplier::new(supplier);
        self.decide_supplier(move |_| Box::new(shared.clone()))
    }

    /// Draws values from a `fake` generator.
    pub fn use_spec<T, F>(self, spec: F) -> FacetBuilder
    where
        F: Send + Sync + 'static,
        T: Dummy<F> + Into<Value> + 'static,
    {
        let spec = Arc::new(spec);
        self.decide_supplier(move |_| {
            let spec = Arc::clone(&spec);
            let mut rng = fresh_rng();
            Box::new(move || {
                let spec_ref: &F = &spec;
                let value: T = spec_ref.fake_with_rng(&mut rng);
                Into::<Value>::into(value)
            })
        })
    }

    /// Chooses the supplier once the column metadata is known.
    pub fn decide_supplier<D>(self, decide: D) -> FacetBuilder
    where
        D: Fn(&rowsmith_core::ColumnDescriptor) -> BoxedSupplier + Send + Sync + 'static,
    {
        let ColumnStep {
            mut builder,
            column,
        } = self;
        builder.put_column(column, decider(decide));
        builder
    }

    /// Cycles through `values`, wrapping around.
    pub fn round_robin<I, V>(self, values: I) -> FacetBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match RoundRobin::new(values) {
            Ok(round_robin) => self.decide_supplier(move |_| Box::new(round_robin.clone())),
            Err(err) => {
                let mut builder = self.builder;
                builder.record(err);
                builder
            }
        }
    }

    /// Computes the value from the zero-based row index.
    pub fn for_row<F>(self, to_value: F) -> FacetBuilder
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        let to_value = Arc::new(to_value);
        self.decide_supplier(move |_| {
            let to_value = Arc::clone(&to_value);
            Box::new(RowIndexSupplier::new(move |index: u64| to_value(index)))
        })
    }

    /// Sources values from a column another facet generates.
    pub fn from(self, facet: &TableFacet, column: &str) -> FromStep {
        let ColumnStep {
            mut builder,
            column: own,
        } = self;
        let referenced = referenced_column(&mut builder, column).unwrap_or_default();
        let pool = Arc::clone(facet.pool());
        if !referenced.is_empty() {
            pool.keep_column(&referenced);
        }
        let domain: DomainSource = Arc::new(move || pool.values(&referenced));
        FromStep {
            builder,
            column: own,
            domain,
        }
    }
}

type DomainSource = Arc<dyn Fn() -> Result<Arc<[Value]>, GenerationError> + Send + Sync>;

/// Chooses how pooled values of another facet are consumed.
///
/// Consumption does not affect the row count.
pub struct FromStep {
    builder: FacetBuilder,
    column: String,
    domain: DomainSource,
}

impl FromStep {
    /// Transforms each pooled value before it is consumed.
    pub fn map<F>(self, transform: F) -> FromStep
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let FromStep {
            builder,
            column,
            domain,
        } = self;
        let mapped: DomainSource = Arc::new(move || {
            let values = domain()?;
            Ok(values.iter().map(&transform).collect::<Vec<_>>().into())
        });
        FromStep {
            builder,
            column,
            domain: mapped,
        }
    }

    /// Cycles through the whole pool, wrapping around.
    pub fn round_robin(self) -> FacetBuilder {
        self.finish(|values| Ok(Box::new(RoundRobin::from_shared(values)?) as BoxedSupplier))
    }

    /// Draws a pooled value independently for every row.
    pub fn random(self) -> FacetBuilder {
        self.finish(|values| Ok(Box::new(RandomPick::from_shared(values)?) as BoxedSupplier))
    }

    fn finish(
        self,
        build: fn(Arc<[Value]>) -> Result<BoxedSupplier, GenerationError>,
    ) -> FacetBuilder {
        let FromStep {
            mut builder,
            column,
            domain,
        } = self;
        builder.put_column(
            column,
            decider(move |_| {
                let domain = Arc::clone(&domain);
                Box::new(LazySupplier::new(move || build(domain()?)))
            }),
        );
        builder
    }
}

fn referenced_column(builder: &mut FacetBuilder, column: &str) -> Option<String> {
    let column = column.trim().to_lowercase();
    if column.is_empty() {
        builder.record(GenerationError::config(
            "referenced column must not be blank",
        ));
        return None;
    }
    Some(column)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rowsmith_core::{ColumnDescriptor, EngineType};

    use super::*;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, "int4", EngineType::Integer)
    }

    fn take(facet: &TableFacet, name: &str, n: usize) -> Vec<Value> {
        let mut supplier = facet.resolve_supplier(&column(name)).expect("supplier");
        (0..n)
            .map(|_| supplier.next_value().expect("value"))
            .collect()
    }

    fn parent_with_ids(ids: &[i64]) -> TableFacet {
        let parent = TableFacet::builder("parent")
            .number_of_rows(ids.len() as u64)
            .build()
            .expect("parent");
        parent.pool().keep_column("id");
        for id in ids {
            let value = Value::Int(*id);
            parent.pool().preserve_from_pre_insert([("id", &value)]);
        }
        parent
    }

    #[test]
    fn simple_column_suppliers() {
        let facet = TableFacet::builder("t")
            .column("a")
            .fixed(5)
            .column("b")
            .round_robin(["x", "y"])
            .column("c")
            .for_row(|index| Value::Int(index as i64 * 10))
            .build()
            .expect("facet");
        assert_eq!(take(&facet, "a", 2), vec![Value::Int(5), Value::Int(5)]);
        assert_eq!(
            take(&facet, "b", 3),
            vec![Value::from("x"), Value::from("y"), Value::from("x")]
        );
        assert_eq!(take(&facet, "c", 2), vec![Value::Int(0), Value::Int(10)]);
    }

    #[test]
    fn from_round_robin_and_random_use_the_pool() {
        let parent = parent_with_ids(&[1, 2, 3]);
        let child = TableFacet::builder("child")
            .number_of_rows(5)
            .column("rr")
            .from(&parent, "id")
            .round_robin()
            .column("rnd")
            .from(&parent, "ID")
            .random()
            .build()
            .expect("child");

        let round: Vec<i64> = take(&child, "rr", 4).iter().filter_map(Value::as_i64).collect();
        assert_eq!(round, vec![1, 2, 3, 1]);

        let drawn: HashSet<i64> = take(&child, "rnd", 50).iter().filter_map(Value::as_i64).collect();
        assert!(drawn.is_subset(&HashSet::from([1, 2, 3])));
    }

    #[test]
    fn from_map_transforms_the_domain() {
        let parent = parent_with_ids(&[1, 2]);
        let child = TableFacet::builder("child")
            .column("code")
            .from(&parent, "id")
            .map(|value| Value::from(format!("P-{value}")))
            .round_robin()
            .build()
            .expect("child");
        assert_eq!(
            take(&child, "code", 2),
            vec![Value::from("P-1"), Value::from("P-2")]
        );
    }

    #[test]
    fn pooled_cartesian_domain_is_kept() {
        let parent = parent_with_ids(&[10, 20]);
        let child = TableFacet::builder("child")
            .cartesian_product("parent_id")
            .referencing(&parent, "id")
            .cartesian_product("flag")
            .domain([true, false])
            .build()
            .expect("child");
        let layered = crate::setting::LayeredSetting::new([None]);
        assert_eq!(child.row_count(&layered).expect("rows"), 4);
        let ids: Vec<i64> = take(&child, "parent_id", 4).iter().filter_map(Value::as_i64).collect();
        assert_eq!(ids, vec![10, 10, 20, 20]);
    }

    #[test]
    fn shared_supplier_continues_across_resolutions() {
        let facet = TableFacet::builder("t")
            .column("seq")
            .use_supplier(crate::supplier::Sequence::new(1, 1))
            .build()
            .expect("facet");
        assert_eq!(take(&facet, "seq", 2), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(take(&facet, "seq", 1), vec![Value::Int(3)]);
    }

    #[test]
    fn use_spec_draws_from_fake() {
        let facet = TableFacet::builder("t")
            .column("word")
            .use_spec::<String, _>(fake::faker::lorem::en::Word())
            .build()
            .expect("facet");
        let values = take(&facet, "word", 3);
        assert!(values.iter().all(|value| value.as_str().is_some_and(|w| !w.is_empty())));
    }

    #[test]
    fn referenced_column_must_not_be_blank() {
        let parent = parent_with_ids(&[1]);
        let result = TableFacet::builder("child")
            .referencing("parent_id")
            .parent(&parent, " ")
            .cardinality(1)
            .build();
        assert!(matches!(result, Err(GenerationError::Configuration(_))));
    }
}
