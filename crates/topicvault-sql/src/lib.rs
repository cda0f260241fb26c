//! # topicvault-sql
//!
//! Maps key-value topics onto relational tables and queries them back.
//!
//! A topic is identified by an ordered composite index and carries an opaque
//! JSON value. Each index field becomes a fixed-length key column, followed
//! by a `value` column holding the JSON document and a `mediaType` tag.
//! Filters may target index columns directly or reach into the JSON value
//! through `JSON_EXTRACT`.
//!
//! ## Quick start
//!
//! ```no_run
//! use topicvault_sql::{
//!     tables, Predicate, SchemaOptions, SqliteVault, TopicQuery, VaultRegistry,
//! };
//! # use std::sync::Arc;
//! # async fn run() -> Result<(), topicvault_sql::TopicError> {
//! let vault = Arc::new(SqliteVault::open_memory()?);
//! tables::create_topic_table(&*vault, "players", &["id"], &SchemaOptions::default())
//!     .await?;
//!
//! let registry = VaultRegistry::new();
//! registry.register("main", vault);
//!
//! let query = TopicQuery::new(registry);
//! let filter = [Predicate::nested("city", "LIKE", "tok%")];
//! // let players: Vec<Player> = query.find("main", &filter).await?;
//! # let _ = (query, filter);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod predicate;
pub mod registry;
pub mod schema;
pub mod tables;
pub mod topic;
pub mod vault;

// Re-exports for convenience.
pub use config::{Config, VaultSpec};
pub use error::{BackendError, TopicError};
pub use predicate::{
    compile_where, compile_where_literal, ParamStyle, Predicate, QueryParams, ScalarValue,
    WhereClause,
};
pub use registry::{resolve_vault, VaultLookup, VaultRegistry};
pub use schema::{derive_columns, ColumnDef, ColumnType, SchemaOptions};
pub use topic::{decode_row, decode_rows, query, ParsedInstance, Topic, TopicDefinition, TopicQuery};
pub use vault::{RawRow, SqliteVault, Vault};
