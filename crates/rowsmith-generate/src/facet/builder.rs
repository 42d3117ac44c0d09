use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::trace;

use crate::cartesian::{CartesianProduct, Domain, cartesian_supplier};
use crate::errors::GenerationError;
use crate::pool::ValuePool;
use crate::setting::DataSetting;
use crate::supplier::{SupplierDecider, decider};
use crate::tuple::Tuple;

use super::steps::{CartesianStep, ColumnStep, KeyStep, ReferenceStep};
use super::{RowSource, TableFacet, TupleCallback};

const CARTESIAN: &str = "cartesian product";

/// Builder of a [`TableFacet`].
///
/// Methods chain by value. The first invalid call is remembered and
/// returned by [`FacetBuilder::build`]; later calls are still recorded but
/// cannot clear it.
pub struct FacetBuilder {
    table: Arc<str>,
    policy: Option<&'static str>,
    row_source: Option<RowSource>,
    cartesian: CartesianProduct,
    columns: Vec<(String, SupplierDecider)>,
    inclusion: BTreeSet<String>,
    exclusion: BTreeSet<String>,
    callback: Option<TupleCallback>,
    setting: Option<Arc<DataSetting>>,
    pool: Arc<ValuePool>,
    error: Option<GenerationError>,
}

impl FacetBuilder {
    pub(super) fn new(table: &str) -> Self {
        let table = table.trim();
        let mut builder = Self {
            table: table.into(),
            policy: None,
            row_source: None,
            cartesian: CartesianProduct::new(),
            columns: Vec::new(),
            inclusion: BTreeSet::new(),
            exclusion: BTreeSet::new(),
            callback: None,
            setting: None,
            pool: Arc::new(ValuePool::new(table)),
            error: None,
        };
        if table.is_empty() {
            builder.record(GenerationError::config("table name must not be blank"));
        }
        builder
    }

    /// Fixed, positive number of rows.
    pub fn number_of_rows(mut self, rows: u64) -> Self {
        if !self.claim_row_source("number of rows", None) {
            return self;
        }
        if rows == 0 {
            self.record(GenerationError::config(
                "number of rows must be greater than zero",
            ));
            return self;
        }
        self.row_source = Some(RowSource::Fixed(rows));
        self
    }

    /// Integer key column whose bounded sequence drives the row count.
    pub fn key_of_int(mut self, column: &str) -> KeyStep {
        let column = self.column_name(column);
        self.claim_row_source("key column", Some(&column));
        KeyStep::new(self, column)
    }

    /// Column repeating each value of a referenced column by a cardinality.
    pub fn referencing(mut self, column: &str) -> ReferenceStep {
        let column = self.column_name(column);
        self.claim_row_source("referencing cardinality", Some(&column));
        ReferenceStep::new(self, column)
    }

    /// Adds a column domain to the cross product driving the row count.
    ///
    /// May be called once per participating column.
    pub fn cartesian_product(mut self, column: &str) -> CartesianStep {
        let column = self.column_name(column);
        self.claim_row_source(CARTESIAN, Some(&column));
        CartesianStep::new(self, column)
    }

    pub fn column(mut self, column: &str) -> ColumnStep {
        let column = self.column_name(column);
        ColumnStep::new(self, column)
    }

    pub fn include_columns(mut self, columns: &[&str]) -> Self {
        if !self.exclusion.is_empty() {
            self.record(GenerationError::config(
                "cannot include columns when excluded columns are set already",
            ));
            return self;
        }
        if columns.is_empty() {
            self.record(GenerationError::config(
                "at least one column must be specified to include",
            ));
            return self;
        }
        for column in columns {
            let column = self.column_name(column);
            self.inclusion.insert(column);
        }
        self
    }

    pub fn exclude_columns(mut self, columns: &[&str]) -> Self {
        if !self.inclusion.is_empty() {
            self.record(GenerationError::config(
                "cannot exclude columns when included columns are set already",
            ));
            return self;
        }
        if columns.is_empty() {
            self.record(GenerationError::config(
                "at least one column must be specified to exclude",
            ));
            return self;
        }
        for column in columns {
            let column = self.column_name(column);
            self.exclusion.insert(column);
        }
        self
    }

    /// Called with every generated row before it is written.
    pub fn on_tuple_generated<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Tuple) -> Result<(), GenerationError> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Facet-local setting, consulted before the generator's.
    pub fn with_setting(mut self, setting: DataSetting) -> Self {
        if let Err(err) = setting.validate() {
            self.record(err);
            return self;
        }
        self.setting = Some(Arc::new(setting));
        self
    }

    pub fn build(self) -> Result<TableFacet, GenerationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut columns = self.columns;
        let mut row_source = self.row_source;
        if !self.cartesian.is_empty() {
            let product = Arc::new(self.cartesian);
            for name in product.column_names() {
                let product = Arc::clone(&product);
                let column = name.to_string();
                columns.push((
                    name.to_string(),
                    decider(move |_| cartesian_supplier(Arc::clone(&product), column.clone())),
                ));
            }
            row_source = Some(RowSource::Cartesian(product));
        }

        trace!(table = %self.table, columns = columns.len(), "built table facet");
        Ok(TableFacet {
            table: self.table,
            row_source,
            columns,
            inclusion: self.inclusion,
            exclusion: self.exclusion,
            callback: self.callback,
            setting: self.setting,
            pool: self.pool,
        })
    }

    pub(super) fn record(&mut self, err: GenerationError) {
        self.error.get_or_insert(err);
    }

    pub(super) fn set_row_source(&mut self, source: RowSource) {
        self.row_source = Some(source);
    }

    pub(super) fn put_column(&mut self, column: String, decide: SupplierDecider) {
        if column.is_empty() {
            return;
        }
        self.columns.push((column, decide));
    }

    pub(super) fn put_cartesian(&mut self, column: String, domain: Domain) {
        if column.is_empty() {
            return;
        }
        self.cartesian.push(column, domain);
    }

    /// Marks the row count as claimed by `policy`; records a conflict if
    /// another policy owns it. Only the cartesian product may be claimed twice.
    fn claim_row_source(&mut self, policy: &'static str, column: Option<&str>) -> bool {
        match self.policy {
            None => {
                self.policy = Some(policy);
                true
            }
            Some(current) if current == CARTESIAN && policy == CARTESIAN => true,
            Some(current) => {
                self.record(GenerationError::config(format!(
                    "number of rows conflict [{}]: already set by {current}",
                    column.unwrap_or("<unknown>")
                )));
                false
            }
        }
    }

    /// Normalized column name; records an error for a blank or already
    /// configured name.
    fn column_name(&mut self, column: &str) -> String {
        let name = column.trim().to_lowercase();
        if name.is_empty() {
            self.record(GenerationError::config("column name must not be blank"));
            return name;
        }
        let conflict = if self.inclusion.contains(&name) {
            Some("included")
        } else if self.exclusion.contains(&name) {
            Some("excluded")
        } else if self.columns.iter().any(|(existing, _)| *existing == name) {
            Some("configured")
        } else if self.cartesian.contains(&name) {
            Some("configured by cartesian product")
        } else {
            None
        };
        if let Some(conflict) = conflict {
            self.record(GenerationError::config(format!(
                "column [{name}] of table [{}] is {conflict} already",
                self.table
            )));
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use rowsmith_core::{ColumnDescriptor, EngineType, Value};

    use super::*;
    use crate::facet::ColumnInclusion;
    use crate::setting::defaults;

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(name, "int4", EngineType::Integer)
    }

    fn config_error(result: Result<TableFacet, GenerationError>) -> String {
        match result {
            Err(GenerationError::Configuration(message)) => message,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_names() {
        config_error(TableFacet::builder("  ").number_of_rows(1).build());
        config_error(TableFacet::builder("t").column(" ").fixed(1).build());
    }

    #[test]
    fn second_row_policy_is_rejected() {
        let message = config_error(
            TableFacet::builder("t")
                .number_of_rows(3)
                .key_of_int("id")
                .range(1, 5, 1)
                .build(),
        );
        assert!(message.contains("number of rows conflict [id]"));

        config_error(TableFacet::builder("t").number_of_rows(3).number_of_rows(4).build());
        config_error(
            TableFacet::builder("t")
                .cartesian_product("a")
                .domain([1, 2])
                .number_of_rows(2)
                .build(),
        );
        config_error(
            TableFacet::builder("t")
                .key_of_int("id")
                .limit(1, 3, 1)
                .cartesian_product("a")
                .domain([1])
                .build(),
        );
    }

    #[test]
    fn duplicate_and_conflicting_columns_are_rejected() {
        config_error(TableFacet::builder("t").column("a").fixed(1).column("A").fixed(2).build());
        config_error(
            TableFacet::builder("t")
                .include_columns(&["a"])
                .exclude_columns(&["b"])
                .build(),
        );
        config_error(TableFacet::builder("t").exclude_columns(&["a"]).column("a").fixed(1).build());
        config_error(TableFacet::builder("t").column("a").fixed(1).include_columns(&["a"]).build());
        config_error(TableFacet::builder("t").include_columns(&[]).build());
        config_error(
            TableFacet::builder("t")
                .cartesian_product("a")
                .domain([1])
                .cartesian_product("a")
                .domain([2])
                .build(),
        );
    }

    #[test]
    fn invalid_ranges_fail_at_build_time() {
        config_error(TableFacet::builder("t").number_of_rows(0).build());
        config_error(TableFacet::builder("t").key_of_int("id").range(5, 1, 1).build());
        config_error(TableFacet::builder("t").column("a").round_robin(Vec::<i64>::new()).build());
    }

    #[test]
    fn row_count_follows_policy_or_setting_default() {
        let layered = crate::setting::LayeredSetting::new([None]);

        let fixed = TableFacet::builder("t").number_of_rows(7).build().expect("facet");
        assert_eq!(fixed.row_count(&layered).expect("rows"), 7);

        let keyed = TableFacet::builder("t")
            .key_of_int("id")
            .range(1, 6, 1)
            .build()
            .expect("facet");
        assert_eq!(keyed.row_count(&layered).expect("rows"), 5);

        let product = TableFacet::builder("t")
            .cartesian_product("a")
            .domain([1, 2])
            .cartesian_product("b")
            .domain([1, 2, 3])
            .build()
            .expect("facet");
        assert_eq!(product.row_count(&layered).expect("rows"), 6);

        let unset = TableFacet::builder("t").build().expect("facet");
        assert_eq!(unset.row_count(&layered).expect("rows"), defaults::DEFAULT_ROWS);

        let local = TableFacet::builder("t")
            .with_setting(DataSetting::new().set_default_rows(12))
            .build()
            .expect("facet");
        let layered = crate::setting::LayeredSetting::new([local.setting().cloned()]);
        assert_eq!(local.row_count(&layered).expect("rows"), 12);
    }

    #[test]
    fn key_column_restarts_for_each_resolution() {
        let facet = TableFacet::builder("t")
            .key_of_int("id")
            .limit(10, 2, 5)
            .build()
            .expect("facet");
        for _ in 0..2 {
            let mut supplier = facet.resolve_supplier(&column("ID")).expect("supplier");
            assert_eq!(supplier.next_value().expect("value"), Value::Int(10));
            assert_eq!(supplier.next_value().expect("value"), Value::Int(15));
            assert!(supplier.next_value().is_err());
        }
    }

    #[test]
    fn inclusion_modes() {
        let included = TableFacet::builder("t")
            .column("a")
            .fixed(1)
            .include_columns(&["b"])
            .build()
            .expect("facet");
        assert_eq!(included.column_inclusion(&column("a")), ColumnInclusion::Include);
        assert_eq!(included.column_inclusion(&column("B")), ColumnInclusion::Include);
        assert_eq!(included.column_inclusion(&column("c")), ColumnInclusion::Exclude);

        let excluded = TableFacet::builder("t")
            .exclude_columns(&["b"])
            .build()
            .expect("facet");
        assert_eq!(excluded.column_inclusion(&column("b")), ColumnInclusion::Exclude);
        assert_eq!(excluded.column_inclusion(&column("c")), ColumnInclusion::NotSet);
        assert_eq!(excluded.configured_column_names(), vec!["b"]);
    }

    #[test]
    fn invalid_local_setting_fails_the_build() {
        config_error(
            TableFacet::builder("t")
                .with_setting(DataSetting::new().set_default_rows(0))
                .build(),
        );
    }

    #[test]
    fn referencing_reads_parent_pool_in_pairs() {
        let parent = TableFacet::builder("parent")
            .key_of_int("id")
            .range(1, 5, 1)
            .build()
            .expect("parent");
        let child = TableFacet::builder("child")
            .referencing("parent_id")
            .parent(&parent, "id")
            .cardinality(2)
            .build()
            .expect("child");
        assert!(parent.pool().is_kept("id"));

        for id in 1..=4 {
            let value = Value::Int(id);
            parent.pool().preserve_from_pre_insert([("id", &value)]);
        }

        let layered = crate::setting::LayeredSetting::new([None]);
        assert_eq!(child.row_count(&layered).expect("rows"), 8);
        let mut supplier = child
            .resolve_supplier(&column("parent_id"))
            .expect("supplier");
        let values: Vec<i64> = (0..8)
            .map(|_| supplier.next_value().expect("value").as_i64().expect("int"))
            .collect();
        assert_eq!(values, vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }
}
