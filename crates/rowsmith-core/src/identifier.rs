//! Table references as written by users, folded the way SQL folds unquoted
//! identifiers.
//!
//! `Orders` and `orders` name the same table; `"Orders"` keeps its case.

/// Folds one identifier: a double-quoted name keeps its case with `""`
/// unescaped, anything else is trimmed and lowercased.
pub fn fold_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(quoted) => quoted.replace("\"\"", "\""),
        None => trimmed.to_lowercase(),
    }
}

/// Splits `schema.table` at the first dot outside double quotes and folds
/// both parts. A reference without a schema yields `None` for it.
pub fn split_table(table: &str) -> (Option<String>, String) {
    let mut quoted = false;
    let dot = table.char_indices().find_map(|(index, c)| match c {
        '"' => {
            quoted = !quoted;
            None
        }
        '.' if !quoted => Some(index),
        _ => None,
    });

    match dot {
        Some(index) => {
            let (schema, name) = (&table[..index], &table[index + 1..]);
            if schema.trim().is_empty() || name.trim().is_empty() {
                (None, fold_identifier(table))
            } else {
                (Some(fold_identifier(schema)), fold_identifier(name))
            }
        }
        None => (None, fold_identifier(table)),
    }
}

/// The folded form of a table reference, equal for every spelling of the
/// same table.
pub fn normalize_table(table: &str) -> String {
    match split_table(table) {
        (Some(schema), name) => format!("{schema}.{name}"),
        (None, name) => name,
    }
}
