use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, PropertySet};

use super::queries::RawColumn;

pub fn map_columns(mut raw: Vec<RawColumn>) -> Vec<ColumnDescriptor> {
    raw.sort_by_key(|col| col.ordinal_position);
    raw.into_iter().map(map_column).collect()
}

fn map_column(col: RawColumn) -> ColumnDescriptor {
    let engine_type = engine_type_for(&col.udt_name, &col.type_category);
    let properties = properties_of(&col);

    let mut column = ColumnDescriptor::new(col.name, col.udt_name, engine_type)
        .with_properties(properties);
    let size = col.character_max_length.or(col.numeric_precision);
    if let Some(size) = size.and_then(|size| u32::try_from(size).ok()) {
        column = column.with_size(size);
    }
    if let Some(scale) = col.numeric_scale.and_then(|scale| u32::try_from(scale).ok()) {
        column = column.with_decimal_digits(scale);
    }
    column
}

fn properties_of(col: &RawColumn) -> PropertySet {
    let mut properties = PropertySet::empty();
    if col.is_nullable {
        properties.insert(ColumnProperty::Nullable);
    }
    if col.is_generated {
        properties.insert(ColumnProperty::Generated);
        return properties;
    }
    let serial = col
        .default
        .as_deref()
        .is_some_and(|default| default.starts_with("nextval("));
    if col.identity_generation.is_some() || serial {
        properties.insert(ColumnProperty::AutoIncrement);
    }
    if col.default.is_some() || col.identity_generation.is_some() {
        properties.insert(ColumnProperty::DefaultValue);
    }
    properties
}

/// Maps a Postgres type name (and its `typcategory`) to an [`EngineType`].
pub fn engine_type_for(udt_name: &str, type_category: &str) -> EngineType {
    if type_category == "A" {
        return EngineType::Array;
    }
    match udt_name {
        "bool" => EngineType::Boolean,
        "bit" | "varbit" => EngineType::Bit,
        "int2" => EngineType::SmallInt,
        "int4" | "oid" => EngineType::Integer,
        "int8" => EngineType::BigInt,
        "float4" => EngineType::Real,
        "float8" | "money" => EngineType::Double,
        "numeric" => EngineType::Numeric,
        "bpchar" | "char" => EngineType::Char,
        "varchar" | "text" | "name" | "citext" => EngineType::Varchar,
        "bytea" => EngineType::Binary,
        "date" => EngineType::Date,
        "time" => EngineType::Time,
        "timetz" => EngineType::TimeWithTimezone,
        "timestamp" => EngineType::Timestamp,
        "timestamptz" => EngineType::TimestampWithTimezone,
        "xml" => EngineType::SqlXml,
        "refcursor" => EngineType::RefCursor,
        _ if type_category == "C" => EngineType::Struct,
        _ => EngineType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, udt_name: &str) -> RawColumn {
        RawColumn {
            ordinal_position: 1,
            name: name.to_string(),
            udt_name: udt_name.to_string(),
            type_category: "N".to_string(),
            is_nullable: false,
            default: None,
            identity_generation: None,
            is_generated: false,
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    #[test]
    fn serial_column_is_auto_increment_with_default() {
        let mut col = raw("id", "int4");
        col.default = Some("nextval('users_id_seq'::regclass)".to_string());
        let mapped = map_columns(vec![col]).remove(0);
        assert!(mapped.has_property(ColumnProperty::AutoIncrement));
        assert!(mapped.has_property(ColumnProperty::DefaultValue));
        assert!(!mapped.is_nullable());
        assert_eq!(mapped.engine_type(), EngineType::Integer);
    }

    #[test]
    fn numeric_precision_and_scale_become_size_and_digits() {
        let mut col = raw("price", "numeric");
        col.numeric_precision = Some(10);
        col.numeric_scale = Some(2);
        col.is_nullable = true;
        let mapped = map_columns(vec![col]).remove(0);
        assert_eq!(mapped.size(), Some(10));
        assert_eq!(mapped.decimal_digits(), Some(2));
        assert!(mapped.is_nullable());
    }

    #[test]
    fn generated_column_only_carries_generated_flag() {
        let mut col = raw("total", "int8");
        col.is_generated = true;
        col.default = Some("(qty * price)".to_string());
        let mapped = map_columns(vec![col]).remove(0);
        assert!(mapped.has_property(ColumnProperty::Generated));
        assert!(!mapped.has_property(ColumnProperty::DefaultValue));
    }

    #[test]
    fn uuid_and_arrays_map_to_engine_types() {
        assert_eq!(engine_type_for("uuid", "U"), EngineType::Other);
        assert_eq!(engine_type_for("_int4", "A"), EngineType::Array);
        assert_eq!(engine_type_for("varchar", "S"), EngineType::Varchar);
    }
}
