use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, PropertySet};

use super::queries::RawColumn;

pub fn map_columns(mut raw: Vec<RawColumn>) -> Vec<ColumnDescriptor> {
    raw.sort_by_key(|col| col.position);
    let primary_keys = raw.iter().filter(|col| col.pk > 0).count();
    raw.into_iter()
        .map(|col| map_column(col, primary_keys))
        .collect()
}

fn map_column(col: RawColumn, primary_keys: usize) -> ColumnDescriptor {
    let (type_name, size, digits) = split_declared_type(&col.declared_type);
    let engine_type = engine_type_for(&type_name);
    let rowid = primary_keys == 1 && col.pk == 1 && type_name == "INTEGER";
    let properties = properties_of(&col, rowid);

    let mut column =
        ColumnDescriptor::new(col.name, type_name, engine_type).with_properties(properties);
    if let Some(size) = size {
        column = column.with_size(size);
    }
    if let Some(digits) = digits {
        column = column.with_decimal_digits(digits);
    }
    column
}

fn properties_of(col: &RawColumn, rowid: bool) -> PropertySet {
    let mut properties = PropertySet::empty();
    // 2 and 3 are virtual and stored generated columns.
    if matches!(col.hidden, 2 | 3) {
        properties.insert(ColumnProperty::Generated);
        if col.not_null == 0 {
            properties.insert(ColumnProperty::Nullable);
        }
        return properties;
    }
    if rowid {
        properties.insert(ColumnProperty::AutoIncrement);
        properties.insert(ColumnProperty::DefaultValue);
        return properties;
    }
    if col.not_null == 0 {
        properties.insert(ColumnProperty::Nullable);
    }
    if col.default_value.is_some() {
        properties.insert(ColumnProperty::DefaultValue);
    }
    properties
}

/// `VARCHAR(40)` becomes `("VARCHAR", Some(40), None)`, `DECIMAL(10, 2)`
/// becomes `("DECIMAL", Some(10), Some(2))`.
fn split_declared_type(declared: &str) -> (String, Option<u32>, Option<u32>) {
    let declared = declared.trim();
    let Some((name, rest)) = declared.split_once('(') else {
        return (declared.to_uppercase(), None, None);
    };
    let mut args = rest
        .trim_end_matches(')')
        .split(',')
        .map(|arg| arg.trim().parse::<u32>().ok());
    let size = args.next().flatten();
    let digits = args.next().flatten();
    (name.trim().to_uppercase(), size, digits)
}

/// Maps a declared SQLite type to an [`EngineType`], by exact name first and
/// then by SQLite's column affinity rules.
pub fn engine_type_for(type_name: &str) -> EngineType {
    let upper = type_name.to_uppercase();
    match upper.as_str() {
        "" => return EngineType::Other,
        "BOOLEAN" | "BOOL" => return EngineType::Boolean,
        "TINYINT" => return EngineType::TinyInt,
        "SMALLINT" | "INT2" => return EngineType::SmallInt,
        "BIGINT" | "INT8" => return EngineType::BigInt,
        "DATE" => return EngineType::Date,
        "TIME" => return EngineType::Time,
        "DATETIME" | "TIMESTAMP" => return EngineType::Timestamp,
        "DECIMAL" => return EngineType::Decimal,
        "NUMERIC" => return EngineType::Numeric,
        "REAL" => return EngineType::Real,
        "FLOAT" => return EngineType::Float,
        "DOUBLE" | "DOUBLE PRECISION" => return EngineType::Double,
        "CHAR" | "CHARACTER" => return EngineType::Char,
        "NCHAR" => return EngineType::NChar,
        "NVARCHAR" => return EngineType::NVarchar,
        "CLOB" => return EngineType::Clob,
        "UUID" => return EngineType::Other,
        _ => {}
    }
    if upper.contains("INT") {
        EngineType::Integer
    } else if upper.contains("CHAR") || upper.contains("TEXT") {
        EngineType::Varchar
    } else if upper.contains("CLOB") {
        EngineType::Clob
    } else if upper.contains("BLOB") {
        EngineType::Blob
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        EngineType::Double
    } else {
        EngineType::Numeric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(position: i64, name: &str, declared_type: &str) -> RawColumn {
        RawColumn {
            position,
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            not_null: 1,
            default_value: None,
            pk: 0,
            hidden: 0,
        }
    }

    #[test]
    fn integer_primary_key_is_the_rowid() {
        let mut id = raw(0, "id", "integer");
        id.pk = 1;
        id.not_null = 0;
        let mapped = map_columns(vec![id]).remove(0);
        assert!(mapped.is_auto_increment());
        assert!(mapped.has_property(ColumnProperty::DefaultValue));
        assert!(!mapped.is_nullable());
        assert_eq!(mapped.type_name(), "INTEGER");
    }

    #[test]
    fn composite_keys_have_no_rowid_alias() {
        let mut first = raw(0, "a", "INTEGER");
        first.pk = 1;
        let mut second = raw(1, "b", "INTEGER");
        second.pk = 2;
        let mapped = map_columns(vec![second, first]);
        assert_eq!(mapped[0].name(), "a");
        assert!(mapped.iter().all(|col| !col.is_auto_increment()));
    }

    #[test]
    fn declared_sizes_become_size_and_digits() {
        let mut price = raw(0, "price", "decimal(10, 2)");
        price.not_null = 0;
        let name = raw(1, "name", "VARCHAR(40)");
        let mapped = map_columns(vec![price, name]);
        assert_eq!(mapped[0].engine_type(), EngineType::Decimal);
        assert_eq!(mapped[0].size(), Some(10));
        assert_eq!(mapped[0].decimal_digits(), Some(2));
        assert!(mapped[0].is_nullable());
        assert_eq!(mapped[1].engine_type(), EngineType::Varchar);
        assert_eq!(mapped[1].size(), Some(40));
    }

    #[test]
    fn generated_columns_carry_generated_flag() {
        let mut total = raw(0, "total", "INTEGER");
        total.hidden = 3;
        let mapped = map_columns(vec![total]).remove(0);
        assert!(mapped.has_property(ColumnProperty::Generated));
        assert!(!mapped.has_property(ColumnProperty::DefaultValue));
    }

    #[test]
    fn affinity_rules_cover_unknown_names() {
        assert_eq!(engine_type_for("MEDIUMINT"), EngineType::Integer);
        assert_eq!(engine_type_for("VARYING CHARACTER"), EngineType::Varchar);
        assert_eq!(engine_type_for("BLOB"), EngineType::Blob);
        assert_eq!(engine_type_for("FLOATING"), EngineType::Double);
        assert_eq!(engine_type_for("MONEY"), EngineType::Numeric);
        assert_eq!(engine_type_for(""), EngineType::Other);
    }
}
