//! Configuration loaded from environment variables.
//!
//! | Variable                    | Default   | Description                                   |
//! |-----------------------------|-----------|-----------------------------------------------|
//! | `TOPICVAULT_LOG_LEVEL`      | `info`    | tracing filter (trace/debug/info/warn/error)  |
//! | `TOPICVAULT_KEY_COLUMN_LEN` | `36`      | length of every index column                  |
//! | `TOPICVAULT_MEDIA_TYPE_LEN` | `40`      | length of the `mediaType` column              |
//! | `TOPICVAULT_VAULTS`         | (empty)   | `name=path,...`; `:memory:` for in-memory     |
//! | `TOPICVAULT_PARAM_STYLE`    | `numbered`| `numbered` (`?1`) or `positional` (`?`)       |

use crate::error::TopicError;
use crate::predicate::ParamStyle;
use crate::schema::{SchemaOptions, DEFAULT_KEY_LEN, DEFAULT_MEDIA_TYPE_LEN};

/// Runtime configuration for topic vaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tracing filter string, e.g. `"topicvault_sql=debug,info"`.
    pub log_level: String,

    /// Length of every index column.
    pub key_column_len: usize,

    /// Length of the `mediaType` column.
    pub media_type_len: usize,

    /// Raw vault list, parsed by [`Config::vault_specs`].
    pub vaults: String,

    /// Placeholder syntax used by the parameterised compiler.
    pub param_style: ParamStyle,
}

/// A named vault and the SQLite path backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSpec {
    pub name: String,
    pub path: String,
}

impl Config {
    /// Load configuration from environment variables, applying defaults where
    /// a variable is absent or unparseable.
    pub fn from_env() -> Self {
        Self {
            log_level:      env_str("TOPICVAULT_LOG_LEVEL", "info"),
            key_column_len: env_parse("TOPICVAULT_KEY_COLUMN_LEN", DEFAULT_KEY_LEN),
            media_type_len: env_parse("TOPICVAULT_MEDIA_TYPE_LEN", DEFAULT_MEDIA_TYPE_LEN),
            vaults:         env_str("TOPICVAULT_VAULTS", ""),
            param_style:    env_param_style("TOPICVAULT_PARAM_STYLE"),
        }
    }

    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            key_len: self.key_column_len,
            media_type_len: self.media_type_len,
        }
    }

    /// Parse the `name=path` vault list.
    pub fn vault_specs(&self) -> Result<Vec<VaultSpec>, TopicError> {
        self.vaults
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                    Ok(VaultSpec {
                        name: name.trim().to_string(),
                        path: path.trim().to_string(),
                    })
                }
                _ => Err(TopicError::Config(format!(
                    "vault entry '{entry}' must look like name=path"
                ))),
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            key_column_len: DEFAULT_KEY_LEN,
            media_type_len: DEFAULT_MEDIA_TYPE_LEN,
            vaults: String::new(),
            param_style: ParamStyle::Numbered,
        }
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_param_style(key: &str) -> ParamStyle {
    match std::env::var(key) {
        Ok(v) if v.eq_ignore_ascii_case("positional") => ParamStyle::Positional,
        _ => ParamStyle::Numbered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.schema_options(), SchemaOptions::default());
        assert_eq!(cfg.param_style, ParamStyle::Numbered);
        assert!(cfg.vault_specs().unwrap().is_empty());
    }

    #[test]
    fn env_override_applied() {
        std::env::set_var("TOPICVAULT_KEY_COLUMN_LEN", "26");
        std::env::set_var("TOPICVAULT_PARAM_STYLE", "positional");
        let cfg = Config::from_env();
        assert_eq!(cfg.key_column_len, 26);
        assert_eq!(cfg.param_style, ParamStyle::Positional);
        std::env::remove_var("TOPICVAULT_KEY_COLUMN_LEN");
        std::env::remove_var("TOPICVAULT_PARAM_STYLE");
    }

    #[test]
    fn vault_specs_parsed() {
        let cfg = Config {
            vaults: "main=/var/lib/topics.db, cache=:memory:".into(),
            ..Config::default()
        };
        let specs = cfg.vault_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "main");
        assert_eq!(specs[0].path, "/var/lib/topics.db");
        assert_eq!(specs[1].path, ":memory:");
    }

    #[test]
    fn malformed_vault_spec_rejected() {
        let cfg = Config {
            vaults: "main".into(),
            ..Config::default()
        };
        let err = cfg.vault_specs().unwrap_err();
        assert_eq!(err.code(), "invalid_config");
    }
}
