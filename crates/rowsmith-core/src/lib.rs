//! Core contracts shared by the rowsmith crates.
//!
//! This crate defines column metadata, the dynamic value type that flows
//! between suppliers and drivers, and the shared error type.

pub mod column;
pub mod error;
pub mod identifier;
pub mod redaction;
pub mod types;
pub mod value;

pub use column::ColumnDescriptor;
pub use error::{Error, Result};
pub use identifier::{fold_identifier, normalize_table, split_table};
pub use redaction::{RedactedConnection, connection_identity, redact_connection_string};
pub use types::{ColumnProperty, EngineType, PropertySet};
pub use value::Value;
