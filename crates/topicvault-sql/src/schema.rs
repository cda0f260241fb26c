use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TopicError;

/// Name of the column holding the JSON-encoded topic value.
pub const VALUE_COLUMN: &str = "value";

/// Name of the column holding the value's media type tag.
pub const MEDIA_TYPE_COLUMN: &str = "mediaType";

/// Default length of an index column (UUID-shaped identifiers).
pub const DEFAULT_KEY_LEN: usize = 36;

/// Default length of the `mediaType` column.
pub const DEFAULT_MEDIA_TYPE_LEN: usize = 40;

/// Defines a single column of a topic table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// The column name.
    pub name: String,
    /// The SQL type of the column.
    pub col_type: ColumnType,
    /// Whether this column is the primary key.
    pub primary_key: bool,
}

/// Column types emitted for topic tables.
///
/// - `Key` -> `VARCHAR(n) NOT NULL UNIQUE`
/// - `LongText` -> `LONGTEXT`
/// - `Varchar` -> `VARCHAR(n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// A fixed-length, unique, non-null index component.
    Key { len: usize },
    /// Unbounded text, used for the serialized value.
    LongText,
    /// A bounded string.
    Varchar { len: usize },
}

impl ColumnType {
    /// Returns the SQL type declaration for this column type.
    pub fn sql_type(self) -> String {
        match self {
            ColumnType::Key { len } => format!("VARCHAR({len}) NOT NULL UNIQUE"),
            ColumnType::LongText => "LONGTEXT".to_string(),
            ColumnType::Varchar { len } => format!("VARCHAR({len})"),
        }
    }
}

/// Lengths used when deriving a topic table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Length of every index column.
    pub key_len: usize,
    /// Length of the `mediaType` column.
    pub media_type_len: usize,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            key_len: DEFAULT_KEY_LEN,
            media_type_len: DEFAULT_MEDIA_TYPE_LEN,
        }
    }
}

/// Derives the column schema of a topic table from its index fields.
///
/// Each index field becomes a `Key` column (the first one is the primary
/// key), followed by the `value` and `mediaType` columns. An empty index, a
/// repeated field, or a field that collides with the trailing columns is
/// rejected with [`TopicError::InvalidSchema`].
pub fn derive_columns<S: AsRef<str>>(
    index_fields: &[S],
    options: &SchemaOptions,
) -> Result<Vec<ColumnDef>, TopicError> {
    if index_fields.is_empty() {
        return Err(TopicError::InvalidSchema(
            "Topic index must have at least one field".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(index_fields.len() + 2);
    for (pos, field) in index_fields.iter().enumerate() {
        let field = field.as_ref();
        if field == VALUE_COLUMN || field == MEDIA_TYPE_COLUMN {
            return Err(TopicError::InvalidSchema(format!(
                "Index field '{field}' collides with a reserved column"
            )));
        }
        if !seen.insert(field) {
            return Err(TopicError::InvalidSchema(format!(
                "Duplicate index field: {field}"
            )));
        }
        columns.push(ColumnDef {
            name: field.to_string(),
            col_type: ColumnType::Key {
                len: options.key_len,
            },
            primary_key: pos == 0,
        });
    }

    columns.push(ColumnDef {
        name: VALUE_COLUMN.to_string(),
        col_type: ColumnType::LongText,
        primary_key: false,
    });
    columns.push(ColumnDef {
        name: MEDIA_TYPE_COLUMN.to_string(),
        col_type: ColumnType::Varchar {
            len: options.media_type_len,
        },
        primary_key: false,
    });

    Ok(columns)
}

/// Quotes a SQL identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders the `CREATE TABLE` statement for a table and its columns.
pub fn create_table_sql(table: &str, columns: &[ColumnDef]) -> Result<String, TopicError> {
    if columns.is_empty() {
        return Err(TopicError::InvalidSchema(
            "Table must have at least one column".into(),
        ));
    }

    let col_defs: Vec<String> = columns
        .iter()
        .map(|col| {
            let mut def = format!("{} {}", quote_ident(&col.name), col.col_type.sql_type());
            if col.primary_key {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        col_defs.join(", ")
    ))
}

/// Renders the `DROP TABLE` statement for a table.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE {}", quote_ident(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_single_field_index() {
        let cols = derive_columns(&["id"], &SchemaOptions::default()).unwrap();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0].name, "id");
        assert!(cols[0].primary_key);
        assert_eq!(cols[0].col_type.sql_type(), "VARCHAR(36) NOT NULL UNIQUE");
        assert_eq!(cols[1].name, "value");
        assert_eq!(cols[1].col_type.sql_type(), "LONGTEXT");
        assert_eq!(cols[2].name, "mediaType");
        assert_eq!(cols[2].col_type.sql_type(), "VARCHAR(40)");
    }

    #[test]
    fn only_first_field_is_primary_key() {
        let index = ["guild", "player", "slot"];
        let cols = derive_columns(&index, &SchemaOptions::default()).unwrap();
        assert_eq!(cols.len(), index.len() + 2);
        for (col, field) in cols.iter().zip(index.iter()) {
            assert_eq!(&col.name, field);
        }
        let pks: Vec<bool> = cols.iter().map(|c| c.primary_key).collect();
        assert_eq!(pks, vec![true, false, false, false, false]);
        assert_eq!(cols[3].name, VALUE_COLUMN);
        assert_eq!(cols[4].name, MEDIA_TYPE_COLUMN);
    }

    #[test]
    fn custom_lengths() {
        let opts = SchemaOptions {
            key_len: 26,
            media_type_len: 64,
        };
        let cols = derive_columns(&["ulid"], &opts).unwrap();
        assert_eq!(cols[0].col_type, ColumnType::Key { len: 26 });
        assert_eq!(cols[2].col_type.sql_type(), "VARCHAR(64)");
    }

    #[test]
    fn empty_index_rejected() {
        let empty: [&str; 0] = [];
        let err = derive_columns(&empty, &SchemaOptions::default()).unwrap_err();
        assert_eq!(err.code(), "invalid_schema");
    }

    #[test]
    fn duplicate_or_reserved_fields_rejected() {
        assert!(derive_columns(&["id", "id"], &SchemaOptions::default()).is_err());
        assert!(derive_columns(&["id", "value"], &SchemaOptions::default()).is_err());
        assert!(derive_columns(&["mediaType"], &SchemaOptions::default()).is_err());
    }

    #[test]
    fn create_table_statement() {
        let cols = derive_columns(&["id", "owner"], &SchemaOptions::default()).unwrap();
        let sql = create_table_sql("players", &cols).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"players\" (\
             \"id\" VARCHAR(36) NOT NULL UNIQUE PRIMARY KEY, \
             \"owner\" VARCHAR(36) NOT NULL UNIQUE, \
             \"value\" LONGTEXT, \
             \"mediaType\" VARCHAR(40))"
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(drop_table_sql("players"), "DROP TABLE \"players\"");
    }
}
