//! Declarative test-data generation for relational tables.
//!
//! A [`TableFacet`] describes the rows of one table; a [`Generator`] reads
//! the table's column metadata, fills every column from the facet or the
//! layered [`DataSetting`]s and inserts the rows in batches.

pub mod cardinality;
pub mod cartesian;
pub mod config;
pub mod engine;
pub mod errors;
pub mod facet;
pub mod key;
pub mod logging;
mod memo;
pub mod pool;
pub mod postgres;
pub mod row;
pub mod session;
pub mod setting;
pub mod sql;
pub mod sqlite;
pub mod supplier;
pub mod tuple;
pub mod writer;

pub use config::{GeneratorConfig, LoggingConfig};
pub use engine::Generator;
pub use errors::GenerationError;
pub use facet::{ColumnInclusion, FacetBuilder, TableFacet};
pub use key::KeySequence;
pub use logging::init_logging;
pub use pool::ValuePool;
pub use postgres::PgSession;
pub use session::Session;
pub use setting::{ColumnMatcher, DataSetting, LayeredSetting, SettingInfo, defaults};
pub use sql::{IdentifierUsage, InsertStatement, Placeholder};
pub use sqlite::SqliteSession;
pub use supplier::{BoxedSupplier, ValueSupplier};
pub use tuple::Tuple;
pub use writer::{BatchWriter, KeyRetrieval, TransactionMode, WriteStats};

pub use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, Value};
