//! INSERT statement construction.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use rowsmith_core::{ColumnDescriptor, split_table};

const QUOTE: char = '"';

/// Keywords no identifier may be without quotes.
const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both", "case",
    "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user", "default",
    "deferrable", "desc", "distinct", "do", "else", "end", "except", "false", "fetch", "for",
    "foreign", "from", "grant", "group", "having", "in", "initially", "intersect", "into",
    "lateral", "leading", "limit", "localtime", "localtimestamp", "not", "null", "offset", "on",
    "only", "or", "order", "placing", "primary", "references", "returning", "select",
    "session_user", "some", "symmetric", "system_user", "table", "then", "to", "trailing", "true",
    "union", "unique", "user", "using", "variadic", "when", "where", "window", "with",
];

/// Keywords allowed as type or function names only.
const TYPE_FUNC_NAME: &[&str] = &[
    "authorization", "binary", "collation", "concurrently", "cross", "current_schema", "freeze",
    "full", "ilike", "inner", "is", "isnull", "join", "left", "like", "natural", "notnull",
    "outer", "overlaps", "right", "similar", "tablesample", "verbose",
];

/// Keywords allowed as table and column names but not as type names.
const COL_NAME: &[&str] = &[
    "between", "bigint", "bit", "boolean", "char", "character", "coalesce", "dec", "decimal",
    "exists", "extract", "float", "greatest", "grouping", "inout", "int", "integer", "interval",
    "json", "json_array", "json_arrayagg", "json_object", "json_objectagg", "least", "national",
    "nchar", "none", "normalize", "numeric", "out", "overlay", "position", "precision", "real",
    "row", "setof", "smallint", "substring", "time", "timestamp", "treat", "trim", "values",
    "varchar", "xmlattributes", "xmlconcat", "xmlelement", "xmlexists", "xmlforest",
    "xmlnamespaces", "xmlparse", "xmlpi", "xmlroot", "xmlserialize", "xmltable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordCategory {
    Reserved,
    TypeFuncName,
    ColName,
}

static KEYWORDS: LazyLock<HashMap<&'static str, KeywordCategory>> = LazyLock::new(|| {
    let mut keywords = HashMap::new();
    for (words, category) in [
        (RESERVED, KeywordCategory::Reserved),
        (TYPE_FUNC_NAME, KeywordCategory::TypeFuncName),
        (COL_NAME, KeywordCategory::ColName),
    ] {
        for word in words {
            keywords.insert(*word, category);
        }
    }
    keywords
});

/// Where an identifier appears, which decides the keywords it may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierUsage {
    Table,
    Column,
    Type,
}

/// Bind parameter style of the target engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `?` for every parameter.
    #[default]
    Question,
    /// `$1`, `$2`, ... numbered across the whole statement.
    Dollar,
    /// Numbered and cast to the declared column type, e.g. `$1::int4`, so
    /// any bound value converts to the column on the server.
    DollarCast,
}

impl Placeholder {
    fn write(self, out: &mut String, index: usize, column: &ColumnDescriptor) {
        match self {
            Placeholder::Question => out.push('?'),
            Placeholder::Dollar => {
                let _ = write!(out, "${index}");
            }
            Placeholder::DollarCast => {
                let type_name = quote_identifier(column.type_name(), IdentifierUsage::Type);
                let _ = write!(out, "${index}::{type_name}");
            }
        }
    }
}

/// Quotes a catalog name unless it reads back unchanged without quotes:
/// lowercase letters, digits and underscores, not starting with a digit, and
/// not a keyword reserved for `usage`.
pub fn quote_identifier(identifier: &str, usage: IdentifierUsage) -> String {
    let safe = match KEYWORDS.get(identifier) {
        Some(KeywordCategory::Reserved) => false,
        Some(KeywordCategory::TypeFuncName) => usage == IdentifierUsage::Type,
        Some(KeywordCategory::ColName) => usage != IdentifierUsage::Type,
        None => {
            let mut chars = identifier.chars();
            matches!(chars.next(), Some('a'..='z' | '_'))
                && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        }
    };
    if safe {
        return identifier.to_string();
    }
    let escaped = identifier.replace(QUOTE, "\"\"");
    format!("{QUOTE}{escaped}{QUOTE}")
}

/// Renders a table reference as written by the user, folded and quoted part
/// by part: `Orders` becomes `orders`, `"Orders"` stays `"Orders"`.
pub fn quote_table(table: &str) -> String {
    let (schema, name) = split_table(table);
    let name = quote_identifier(&name, IdentifierUsage::Table);
    match schema {
        Some(schema) => format!("{}.{name}", quote_identifier(&schema, IdentifierUsage::Table)),
        None => name,
    }
}

/// An INSERT over a fixed list of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    columns: Vec<ColumnDescriptor>,
    placeholder: Placeholder,
    sql: String,
}

impl InsertStatement {
    pub fn new(table: &str, columns: &[ColumnDescriptor], placeholder: Placeholder) -> Self {
        let mut statement = Self {
            table: table.to_string(),
            columns: columns.to_vec(),
            placeholder,
            sql: String::new(),
        };
        statement.sql = statement.render(1, &[]);
        statement
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// Single-row SQL.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SQL inserting `rows` rows, returning `returning` columns when given.
    ///
    /// Without columns the statement inserts one row of defaults, whatever
    /// `rows` is.
    pub fn render(&self, rows: usize, returning: &[String]) -> String {
        if self.columns.is_empty() {
            let mut sql = format!("INSERT INTO {} DEFAULT VALUES", quote_table(&self.table));
            push_returning(&mut sql, returning);
            return sql;
        }

        let mut sql = format!("INSERT INTO {} (", quote_table(&self.table));
        sql.push_str(
            &self
                .columns
                .iter()
                .map(|column| quote_identifier(column.name(), IdentifierUsage::Column))
                .collect::<Vec<_>>()
                .join(", "),
        );
        sql.push_str(")\nVALUES ");

        let mut index = 1;
        for row in 0..rows.max(1) {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for (position, column) in self.columns.iter().enumerate() {
                if position > 0 {
                    sql.push_str(", ");
                }
                self.placeholder.write(&mut sql, index, column);
                index += 1;
            }
            sql.push(')');
        }
        push_returning(&mut sql, returning);
        sql
    }
}

fn push_returning(sql: &mut String, returning: &[String]) {
    if returning.is_empty() {
        return;
    }
    sql.push_str("\nRETURNING ");
    sql.push_str(
        &returning
            .iter()
            .map(|column| quote_identifier(column, IdentifierUsage::Column))
            .collect::<Vec<_>>()
            .join(", "),
    );
}
