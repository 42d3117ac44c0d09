use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-neutral type code of a column, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    LongNVarchar,
    Clob,
    NClob,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Date,
    Time,
    TimeWithTimezone,
    Timestamp,
    TimestampWithTimezone,
    Array,
    Struct,
    RowId,
    Null,
    Object,
    Distinct,
    Other,
    SqlXml,
    Ref,
    RefCursor,
    DataLink,
}

impl EngineType {
    /// Types the built-in settings never generate values for.
    pub const UNSUPPORTED: [EngineType; 11] = [
        EngineType::Array,
        EngineType::Struct,
        EngineType::RowId,
        EngineType::Null,
        EngineType::Object,
        EngineType::Distinct,
        EngineType::Other,
        EngineType::SqlXml,
        EngineType::Ref,
        EngineType::RefCursor,
        EngineType::DataLink,
    ];

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            EngineType::Char
                | EngineType::Varchar
                | EngineType::LongVarchar
                | EngineType::NChar
                | EngineType::NVarchar
                | EngineType::LongNVarchar
                | EngineType::Clob
                | EngineType::NClob
        )
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Boolean flags a column may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnProperty {
    Nullable,
    DefaultValue,
    AutoIncrement,
    Generated,
}

impl ColumnProperty {
    pub const ALL: [ColumnProperty; 4] = [
        ColumnProperty::Nullable,
        ColumnProperty::DefaultValue,
        ColumnProperty::AutoIncrement,
        ColumnProperty::Generated,
    ];

    fn bit(self) -> u8 {
        match self {
            ColumnProperty::Nullable => 1,
            ColumnProperty::DefaultValue => 1 << 1,
            ColumnProperty::AutoIncrement => 1 << 2,
            ColumnProperty::Generated => 1 << 3,
        }
    }
}

/// Small copyable set of [`ColumnProperty`] flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySet(u8);

impl PropertySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(properties: &[ColumnProperty]) -> Self {
        properties
            .iter()
            .fold(Self::empty(), |set, property| set.with(*property))
    }

    pub fn with(mut self, property: ColumnProperty) -> Self {
        self.insert(property);
        self
    }

    pub fn insert(&mut self, property: ColumnProperty) {
        self.0 |= property.bit();
    }

    pub fn remove(&mut self, property: ColumnProperty) {
        self.0 &= !property.bit();
    }

    pub fn contains(&self, property: ColumnProperty) -> bool {
        self.0 & property.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ColumnProperty> + '_ {
        ColumnProperty::ALL
            .into_iter()
            .filter(move |property| self.contains(*property))
    }
}

impl FromIterator<ColumnProperty> for PropertySet {
    fn from_iter<I: IntoIterator<Item = ColumnProperty>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, property| set.with(property))
    }
}
