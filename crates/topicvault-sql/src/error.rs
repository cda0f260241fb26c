use serde_json::{json, Value};
use thiserror::Error;

/// Native error reported by a vault backend, kept intact as the source of
/// [`TopicError::QueryExecution`].
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while mapping topics onto a vault or querying them.
#[derive(Debug, Error)]
pub enum TopicError {
    // ── Configuration errors ──────────────────────────────

    /// No vault is registered under the requested name.
    #[error("Requested vault could not be found: {vault_name}")]
    VaultNotFound { vault_name: String },

    /// The vault exists but the topic was never attached to it.
    #[error("Requested vault '{vault_name}' is not attached to topic '{topic}'")]
    InvalidVaultForTopic { vault_name: String, topic: String },

    /// A configuration value could not be interpreted.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The index definition cannot produce a valid table schema.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // ── Query construction errors ─────────────────────────

    /// A top-level field name is not a plain SQL identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A comparator contains characters that are not part of an operator token.
    #[error("Invalid comparator: {0}")]
    InvalidComparator(String),

    // ── Backend errors ────────────────────────────────────

    /// The backend rejected or failed to run a statement.
    #[error("Query execution failed: {0}")]
    QueryExecution(#[source] BackendError),

    // ── Decode errors ─────────────────────────────────────

    /// The `value` column of a row is not valid JSON.
    #[error("Row {row}: value column is not valid JSON: {source}")]
    MalformedValue {
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A row is missing one of the expected columns.
    #[error("Row {row}: missing column '{column}'")]
    MissingColumn { row: usize, column: String },

    /// A row carries a column that is not part of the topic schema.
    #[error("Row {row}: unexpected column '{column}'")]
    UnexpectedColumn { row: usize, column: String },

    /// An index or value column holds something other than a string.
    #[error("Row {row}: column '{column}' must be a string")]
    InvalidIndexValue { row: usize, column: String },

    /// The topic rejected a decoded instance.
    #[error("Failed to instantiate topic: {0}")]
    Instantiation(String),
}

impl TopicError {
    /// Wrap any backend failure, preserving it as the error source.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::QueryExecution(Box::new(err))
    }

    /// Stable machine-readable code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::VaultNotFound { .. } => "vault_not_found",
            Self::InvalidVaultForTopic { .. } => "invalid_vault_for_topic",
            Self::Config(_) => "invalid_config",
            Self::InvalidSchema(_) => "invalid_schema",
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::InvalidComparator(_) => "invalid_comparator",
            Self::QueryExecution(_) => "query_execution_failed",
            Self::MalformedValue { .. } => "malformed_value",
            Self::MissingColumn { .. } => "missing_column",
            Self::UnexpectedColumn { .. } => "unexpected_column",
            Self::InvalidIndexValue { .. } => "invalid_index_value",
            Self::Instantiation(_) => "instantiation_failed",
        }
    }

    /// Structured details payload accompanying [`TopicError::code`].
    pub fn details(&self) -> Value {
        match self {
            Self::VaultNotFound { vault_name } => json!({ "vaultName": vault_name }),
            Self::InvalidVaultForTopic { vault_name, topic } => {
                json!({ "vaultName": vault_name, "topic": topic })
            }
            Self::MalformedValue { row, source } => {
                json!({ "row": row, "reason": source.to_string() })
            }
            Self::MissingColumn { row, column }
            | Self::UnexpectedColumn { row, column }
            | Self::InvalidIndexValue { row, column } => json!({ "row": row, "column": column }),
            Self::Config(msg)
            | Self::InvalidSchema(msg)
            | Self::InvalidIdentifier(msg)
            | Self::InvalidComparator(msg)
            | Self::Instantiation(msg) => json!({ "reason": msg }),
            Self::QueryExecution(source) => json!({ "reason": source.to_string() }),
        }
    }
}
