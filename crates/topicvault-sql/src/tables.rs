//! Table lifecycle on a vault.
//!
//! Batch forms run strictly in caller order, one statement at a time, and
//! stop at the first failure. Tables created before the failure are left in
//! place.

use tracing::debug;

use crate::error::TopicError;
use crate::schema::{derive_columns, ColumnDef, SchemaOptions};
use crate::topic::TopicDefinition;
use crate::vault::Vault;

pub async fn create_table(
    vault: &dyn Vault,
    name: &str,
    columns: &[ColumnDef],
) -> Result<(), TopicError> {
    vault.create_table(name, columns).await
}

pub async fn drop_table(vault: &dyn Vault, name: &str) -> Result<(), TopicError> {
    vault.drop_table(name).await
}

/// Create every table in order.
pub async fn create_tables<I, N>(vault: &dyn Vault, tables: I) -> Result<(), TopicError>
where
    I: IntoIterator<Item = (N, Vec<ColumnDef>)>,
    N: AsRef<str>,
{
    for (name, columns) in tables {
        create_table(vault, name.as_ref(), &columns).await?;
    }
    Ok(())
}

/// Drop every table in order.
pub async fn drop_tables<I, N>(vault: &dyn Vault, names: I) -> Result<(), TopicError>
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    for name in names {
        drop_table(vault, name.as_ref()).await?;
    }
    Ok(())
}

/// Create the table backing a topic from its index fields.
pub async fn create_topic_table<S: AsRef<str>>(
    vault: &dyn Vault,
    name: &str,
    index: &[S],
    options: &SchemaOptions,
) -> Result<(), TopicError> {
    let columns = derive_columns(index, options)?;
    debug!(topic = %name, columns = columns.len(), "Creating topic table");
    create_table(vault, name, &columns).await
}

pub async fn drop_topic_table(vault: &dyn Vault, name: &str) -> Result<(), TopicError> {
    drop_table(vault, name).await
}

/// Create the tables of several topics, given as `(name, index fields)`.
pub async fn create_topic_tables<I, N, S>(
    vault: &dyn Vault,
    topics: I,
    options: &SchemaOptions,
) -> Result<(), TopicError>
where
    I: IntoIterator<Item = (N, Vec<S>)>,
    N: AsRef<str>,
    S: AsRef<str>,
{
    for (name, index) in topics {
        create_topic_table(vault, name.as_ref(), index.as_slice(), options).await?;
    }
    Ok(())
}

/// Drop the tables of several topics.
pub async fn drop_topic_tables<I, N>(vault: &dyn Vault, names: I) -> Result<(), TopicError>
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    for name in names {
        drop_topic_table(vault, name.as_ref()).await?;
    }
    Ok(())
}

/// Create the table of `topic` in `vault`, checking attachment first.
pub async fn create_definition_table(
    vault: &dyn Vault,
    vault_name: &str,
    topic: &TopicDefinition,
    options: &SchemaOptions,
) -> Result<(), TopicError> {
    topic.ensure_attached(vault_name)?;
    create_topic_table(vault, &topic.name, topic.index.as_slice(), options).await
}
