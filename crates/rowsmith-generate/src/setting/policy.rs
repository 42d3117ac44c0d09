use rowsmith_core::{ColumnDescriptor, ColumnProperty, PropertySet};

/// Whether the flags of a column allow it to be generated automatically.
///
/// The strongest flag present decides: generated, then auto-increment, then
/// nullable, then default value. A column without flags is always generated.
pub fn allows_by_properties(column: &ColumnDescriptor, auto_generating: PropertySet) -> bool {
    let properties = column.properties();
    if properties.is_empty() {
        return true;
    }
    const PRECEDENCE: [ColumnProperty; 4] = [
        ColumnProperty::Generated,
        ColumnProperty::AutoIncrement,
        ColumnProperty::Nullable,
        ColumnProperty::DefaultValue,
    ];
    PRECEDENCE
        .into_iter()
        .find(|property| properties.contains(*property))
        .is_none_or(|property| auto_generating.contains(property))
}
