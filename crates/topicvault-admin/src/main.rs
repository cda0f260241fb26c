//! topicvault-admin — table lifecycle and ad-hoc queries for topic vaults.
//!
//! ```text
//! topicvault-admin create <topics.json>   create every topic table in its attached vaults
//! topicvault-admin drop   <topics.json>   drop every topic table from its attached vaults
//! topicvault-admin query  <vault> <sql>   print the raw rows of a statement as JSON
//! ```
//!
//! Vaults come from `TOPICVAULT_VAULTS` (`name=path,...`). The topics file
//! is a JSON array of `{ "name", "index", "vaults" }` objects.

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use topicvault_sql::{
    resolve_vault, tables, topic::query, Config, TopicDefinition, VaultRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────────
    let config = Config::from_env();

    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();

    let registry = VaultRegistry::from_config(&config)?;
    info!(vaults = ?registry.names(), "topicvault-admin starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["create", path] => {
            let topics = load_topics(path)?;
            let options = config.schema_options();
            for topic in &topics {
                for vault_name in topic.attached_vaults() {
                    let vault = resolve_vault(&registry, vault_name)?;
                    tables::create_definition_table(vault.as_ref(), vault_name, topic, &options)
                        .await
                        .with_context(|| format!("creating table for topic '{}'", topic.name))?;
                    info!(topic = %topic.name, vault = %vault_name, "Created topic table");
                }
            }
        }
        ["drop", path] => {
            let topics = load_topics(path)?;
            for topic in &topics {
                for vault_name in topic.attached_vaults() {
                    let vault = resolve_vault(&registry, vault_name)?;
                    tables::drop_topic_table(vault.as_ref(), &topic.name)
                        .await
                        .with_context(|| format!("dropping table for topic '{}'", topic.name))?;
                    info!(topic = %topic.name, vault = %vault_name, "Dropped topic table");
                }
            }
        }
        ["query", vault_name, sql] => {
            let vault = resolve_vault(&registry, vault_name)?;
            let rows = query(vault.as_ref(), sql, &[]).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => bail!("usage: topicvault-admin <create|drop> <topics.json> | query <vault> <sql>"),
    }

    Ok(())
}

fn load_topics(path: &str) -> anyhow::Result<Vec<TopicDefinition>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read topics file {path}"))?;
    let topics = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse topics file {path}"))?;
    Ok(topics)
}
