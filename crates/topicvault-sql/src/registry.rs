//! VaultRegistry — named vault lookup injected into the query layer.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::Config;
use crate::error::TopicError;
use crate::vault::{SqliteVault, Vault};

/// Resolves a vault name to a vault handle.
pub trait VaultLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Vault>>;
}

impl<F> VaultLookup for F
where
    F: Fn(&str) -> Option<Arc<dyn Vault>> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<Arc<dyn Vault>> {
        self(name)
    }
}

/// Look up a vault, failing with [`TopicError::VaultNotFound`] when it is
/// not registered.
pub fn resolve_vault<L>(lookup: &L, name: &str) -> Result<Arc<dyn Vault>, TopicError>
where
    L: VaultLookup + ?Sized,
{
    lookup.lookup(name).ok_or_else(|| TopicError::VaultNotFound {
        vault_name: name.to_string(),
    })
}

/// Thread-safe registry of named vaults.
///
/// Cloning the registry is cheap — it shares the same underlying
/// `DashMap` via `Arc`.
#[derive(Clone, Default)]
pub struct VaultRegistry {
    vaults: Arc<DashMap<String, Arc<dyn Vault>>>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every SQLite vault listed in the configuration.
    pub fn from_config(config: &Config) -> Result<Self, TopicError> {
        let registry = Self::new();
        for spec in config.vault_specs()? {
            let vault = SqliteVault::open(&spec.path)?;
            registry.register(spec.name, Arc::new(vault));
        }
        Ok(registry)
    }

    /// Register or replace a vault.
    pub fn register(&self, name: impl Into<String>, vault: Arc<dyn Vault>) {
        self.vaults.insert(name.into(), vault);
    }

    /// Remove a vault from the registry.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Vault>> {
        self.vaults.remove(name).map(|(_, v)| v)
    }

    /// Names of all registered vaults, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vaults.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl VaultLookup for VaultRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Vault>> {
        self.vaults.get(name).map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_resolve() {
        let registry = VaultRegistry::new();
        registry.register("main", Arc::new(SqliteVault::open_memory().unwrap()));

        assert!(resolve_vault(&registry, "main").is_ok());
        assert_eq!(registry.names(), vec!["main".to_string()]);
    }

    #[test]
    fn unknown_vault_is_not_found() {
        let registry = VaultRegistry::new();
        let err = resolve_vault(&registry, "missing").err().unwrap();
        assert!(matches!(err, TopicError::VaultNotFound { ref vault_name } if vault_name == "missing"));
    }

    #[test]
    fn remove_unregisters() {
        let registry = VaultRegistry::new();
        registry.register("main", Arc::new(SqliteVault::open_memory().unwrap()));
        assert!(registry.remove("main").is_some());
        assert!(resolve_vault(&registry, "main").is_err());
    }

    #[test]
    fn closure_lookup() {
        let vault: Arc<dyn Vault> = Arc::new(SqliteVault::open_memory().unwrap());
        let lookup = move |name: &str| (name == "only").then(|| Arc::clone(&vault));
        assert!(resolve_vault(&lookup, "only").is_ok());
        assert!(resolve_vault(&lookup, "other").is_err());
    }

    #[test]
    fn from_config_opens_memory_vaults() {
        let cfg = Config {
            vaults: "main=:memory:,cache=:memory:".into(),
            ..Config::default()
        };
        let registry = VaultRegistry::from_config(&cfg).unwrap();
        assert_eq!(registry.names(), vec!["cache".to_string(), "main".to_string()]);
    }
}
