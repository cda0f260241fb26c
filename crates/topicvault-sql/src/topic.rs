use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::TopicError;
use crate::predicate::{compile_where, ParamStyle, Predicate, ScalarValue};
use crate::registry::{resolve_vault, VaultLookup};
use crate::schema::{quote_ident, MEDIA_TYPE_COLUMN, VALUE_COLUMN};
use crate::vault::{RawRow, Vault};

/// Static description of a topic: its name, ordered index fields and the
/// vaults it is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDefinition {
    /// The topic name, also used as its table name.
    pub name: String,
    /// Ordered index fields. The first one is the primary key.
    pub index: Vec<String>,
    /// Vault name -> attached flag.
    #[serde(default)]
    pub vaults: BTreeMap<String, bool>,
}

impl TopicDefinition {
    pub fn new<I, S>(name: impl Into<String>, index: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index: index.into_iter().map(Into::into).collect(),
            vaults: BTreeMap::new(),
        }
    }

    /// Attach the topic to a vault.
    pub fn attach(mut self, vault_name: impl Into<String>) -> Self {
        self.vaults.insert(vault_name.into(), true);
        self
    }

    pub fn is_attached(&self, vault_name: &str) -> bool {
        self.vaults.get(vault_name).copied().unwrap_or(false)
    }

    /// Names of the vaults the topic is attached to.
    pub fn attached_vaults(&self) -> impl Iterator<Item = &str> {
        self.vaults
            .iter()
            .filter(|(_, attached)| **attached)
            .map(|(name, _)| name.as_str())
    }

    /// Fails with [`TopicError::InvalidVaultForTopic`] unless the topic is
    /// attached to `vault_name`.
    pub fn ensure_attached(&self, vault_name: &str) -> Result<(), TopicError> {
        if self.is_attached(vault_name) {
            Ok(())
        } else {
            Err(TopicError::InvalidVaultForTopic {
                vault_name: vault_name.to_string(),
                topic: self.name.clone(),
            })
        }
    }
}

/// A decoded row: index values plus the parsed JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstance {
    pub index: BTreeMap<String, String>,
    pub value: Value,
}

/// A topic type that can be materialised from vault rows.
#[async_trait]
pub trait Topic: Sized + Send {
    fn definition() -> TopicDefinition;

    /// Build an instance from a decoded row.
    async fn create(instance: ParsedInstance) -> Result<Self, TopicError>;
}

/// Decode a single row. `row_idx` is only used for error reporting.
///
/// The row must carry exactly the index columns plus `value` and
/// `mediaType`; index columns must be strings and `value` must be a JSON
/// document encoded as a string.
pub fn decode_row<S: AsRef<str>>(
    row_idx: usize,
    row: &RawRow,
    index_fields: &[S],
) -> Result<ParsedInstance, TopicError> {
    if let Some(column) = row.keys().find(|k| {
        let k = k.as_str();
        k != VALUE_COLUMN && k != MEDIA_TYPE_COLUMN && !index_fields.iter().any(|f| f.as_ref() == k)
    }) {
        return Err(TopicError::UnexpectedColumn {
            row: row_idx,
            column: column.clone(),
        });
    }
    if !row.contains_key(MEDIA_TYPE_COLUMN) {
        return Err(TopicError::MissingColumn {
            row: row_idx,
            column: MEDIA_TYPE_COLUMN.to_string(),
        });
    }

    let raw_value = match row.get(VALUE_COLUMN) {
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(TopicError::InvalidIndexValue {
                row: row_idx,
                column: VALUE_COLUMN.to_string(),
            })
        }
        None => {
            return Err(TopicError::MissingColumn {
                row: row_idx,
                column: VALUE_COLUMN.to_string(),
            })
        }
    };
    let value = serde_json::from_str(raw_value).map_err(|source| TopicError::MalformedValue {
        row: row_idx,
        source,
    })?;

    let mut index = BTreeMap::new();
    for field in index_fields {
        let field = field.as_ref();
        match row.get(field) {
            Some(Value::String(s)) => {
                index.insert(field.to_string(), s.clone());
            }
            Some(_) => {
                return Err(TopicError::InvalidIndexValue {
                    row: row_idx,
                    column: field.to_string(),
                })
            }
            None => {
                return Err(TopicError::MissingColumn {
                    row: row_idx,
                    column: field.to_string(),
                })
            }
        }
    }

    Ok(ParsedInstance { index, value })
}

/// Decode a batch of rows, preserving order. The first bad row fails the
/// whole batch and no instances are returned.
pub fn decode_rows<S: AsRef<str>>(
    rows: &[RawRow],
    index_fields: &[S],
) -> Result<Vec<ParsedInstance>, TopicError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| decode_row(i, row, index_fields))
        .collect()
}

/// Run a statement against a vault and return its raw rows.
pub async fn query(
    vault: &dyn Vault,
    sql: &str,
    params: &[ScalarValue],
) -> Result<Vec<RawRow>, TopicError> {
    vault.query(sql, params).await
}

/// Query layer over a set of named vaults.
pub struct TopicQuery<L> {
    vaults: L,
    style: ParamStyle,
}

impl<L: VaultLookup> TopicQuery<L> {
    pub fn new(vaults: L) -> Self {
        Self {
            vaults,
            style: ParamStyle::default(),
        }
    }

    pub fn with_param_style(mut self, style: ParamStyle) -> Self {
        self.style = style;
        self
    }

    /// Run a literal SQL statement and materialise its rows as `T`.
    pub async fn run_sql_query<T: Topic>(
        &self,
        vault_name: &str,
        sql: &str,
    ) -> Result<Vec<T>, TopicError> {
        self.run_query(vault_name, sql, &[]).await
    }

    /// Run a parameterised statement and materialise its rows as `T`.
    ///
    /// The topic must be attached to `vault_name`; this is checked before
    /// the vault is resolved or any statement is issued.
    pub async fn run_query<T: Topic>(
        &self,
        vault_name: &str,
        sql: &str,
        params: &[ScalarValue],
    ) -> Result<Vec<T>, TopicError> {
        let definition = T::definition();
        definition.ensure_attached(vault_name)?;
        let vault = resolve_vault(&self.vaults, vault_name)?;

        let rows = query(vault.as_ref(), sql, params).await?;
        let parsed = decode_rows(&rows, definition.index.as_slice())?;
        debug!(topic = %definition.name, rows = parsed.len(), "Decoded topic rows");

        try_join_all(parsed.into_iter().map(T::create)).await
    }

    /// Select every instance of `T` matching all predicates.
    pub async fn find<T: Topic>(
        &self,
        vault_name: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<T>, TopicError> {
        let definition = T::definition();
        let clause = compile_where(predicates, self.style)?;
        let mut sql = format!("SELECT * FROM {}", quote_ident(&definition.name));
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause.sql);
        }
        self.run_query(vault_name, &sql, &clause.params).await
    }
}
