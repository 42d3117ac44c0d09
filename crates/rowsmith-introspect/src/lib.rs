//! Column metadata discovery and caching.

pub mod adapter;
pub mod cache;
pub mod options;
pub mod postgres;
pub mod sqlite;

pub use adapter::Adapter;
pub use cache::MetadataCache;
pub use options::IntrospectOptions;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;

pub use rowsmith_core::ColumnDescriptor;
