use rowsmith_core::split_table;

/// Options that control how column metadata is discovered.
#[derive(Debug, Clone)]
pub struct IntrospectOptions {
    /// Schema searched for tables given without a `schema.` prefix.
    pub schema: String,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
        }
    }
}

impl IntrospectOptions {
    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Splits `schema.table` into folded catalog names, falling back to the
    /// default schema.
    pub fn qualify(&self, table: &str) -> (String, String) {
        let (schema, name) = split_table(table);
        (schema.unwrap_or_else(|| self.schema.clone()), name)
    }
}
