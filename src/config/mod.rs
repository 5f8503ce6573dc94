pub mod loader;

use std::path::PathBuf;

use toml::{Table, Value};

use crate::errors::ConfigError;

pub use loader::{default_config_path, ConfigLoader, ENV_PREFIX};

// Keys read by the bundled services
pub const DATABASE_TYPE: &str = "database.type";
pub const DATABASE_FILE: &str = "database.file";
pub const LOG_EMAIL: &str = "log.email";
pub const LOG_FILE: &str = "log.file";

const DEFAULT_DATABASE_FILE: &str = "~/.local/share/xo-server/database.json";

/// Application configuration addressed with dotted keys (`database.file`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    root: Table,
}

impl Config {
    /// Empty configuration without defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration holding the built-in defaults.
    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        config.set(DATABASE_TYPE, "json");
        config.set(DATABASE_FILE, DEFAULT_DATABASE_FILE);
        config
    }

    /// Parse a TOML document; `origin` is only used in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let root = content
            .parse::<Table>()
            .map_err(|e| ConfigError::TomlParse(origin.to_string(), e))?;
        Ok(Self { root })
    }

    /// Look a dotted key up. A literal key containing dots is preferred over
    /// walking nested tables.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.root, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Value of `key`, or `default` when it is absent.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).cloned().unwrap_or_else(|| default.into())
    }

    /// String value of `key` treating an absent key, an empty string or
    /// `false` as unset.
    pub fn get_non_empty(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Boolean(false) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key) {
            None => Err(ConfigError::FieldMissing(key.to_string())),
            Some(value) => value.as_str().ok_or_else(|| ConfigError::WrongType {
                key: key.to_string(),
                expected: "a string",
            }),
        }
    }

    /// Path value of `key` with `~` and environment variables expanded.
    pub fn require_path(&self, key: &str) -> Result<PathBuf, ConfigError> {
        let raw = self.require_str(key)?;
        expand_path(raw)
    }

    /// Set a dotted key, creating intermediate tables as needed. A non-table
    /// value in the way is replaced.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut parts: Vec<&str> = key.split('.').collect();
        let last = parts.pop().unwrap_or(key);
        let mut table = &mut self.root;
        for part in parts {
            let slot = table
                .entry(part.to_string())
                .or_insert(Value::Table(Table::new()));
            if !slot.is_table() {
                *slot = Value::Table(Table::new());
            }
            let Value::Table(inner) = slot else {
                return;
            };
            table = inner;
        }
        table.insert(last.to_string(), value.into());
    }

    /// Deep-merge `other` on top of `self`; values from `other` win.
    pub fn merge(&mut self, other: Config) {
        merge_tables(&mut self.root, other.root);
    }

    pub fn as_table(&self) -> &Table {
        &self.root
    }
}

pub fn expand_path(raw: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| ConfigError::Other(format!("cannot expand '{}': {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    if let Some(value) = table.get(key) {
        return Some(value);
    }
    let (head, rest) = key.split_once('.')?;
    match table.get(head)? {
        Value::Table(inner) => lookup(inner, rest),
        _ => None,
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(incoming) => {
                if let Some(Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                    continue;
                }
                base.insert(key, Value::Table(incoming));
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_lookup() {
        let config = Config::from_toml_str(
            r#"
            [database]
            type = "json"
            file = "/var/lib/xo/db.json"

            [log]
            email = "ops@example.org"
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.get_str("database.type"), Some("json"));
        assert_eq!(config.get_str("log.email"), Some("ops@example.org"));
        assert!(config.get("log.file").is_none());
        assert!(config.get("database.type.extra").is_none());
    }

    #[test]
    fn test_literal_dotted_key() {
        let config = Config::from_toml_str(r#""log.file" = "/tmp/xo.log""#, "inline").unwrap();
        assert_eq!(config.get_str("log.file"), Some("/tmp/xo.log"));
    }

    #[test]
    fn test_get_or_falls_back() {
        let config = Config::new();
        assert_eq!(config.get_or("log.email", false), Value::Boolean(false));
    }

    #[test]
    fn test_get_non_empty() {
        let mut config = Config::new();
        config.set("log.email", "");
        config.set("log.file", false);
        config.set("log.level", 3);

        assert_eq!(config.get_non_empty("log.email"), None);
        assert_eq!(config.get_non_empty("log.file"), None);
        assert_eq!(config.get_non_empty("log.level"), Some("3".to_string()));
        assert_eq!(config.get_non_empty("log.missing"), None);
    }

    #[test]
    fn test_set_and_merge() {
        let mut config = Config::with_defaults();
        let overlay = Config::from_toml_str("[database]\nfile = \"/data/db.json\"", "inline").unwrap();
        config.merge(overlay);

        assert_eq!(config.get_str(DATABASE_TYPE), Some("json"));
        assert_eq!(config.get_str(DATABASE_FILE), Some("/data/db.json"));
    }

    #[test]
    fn test_set_replaces_scalar_in_path() {
        let mut config = Config::new();
        config.set("log", "plain");
        config.set("log.file", "/tmp/a.log");

        assert_eq!(config.get_str("log.file"), Some("/tmp/a.log"));
    }

    #[test]
    fn test_require_str_errors() {
        let mut config = Config::new();
        config.set("database.type", 1);

        assert!(matches!(
            config.require_str("database.file"),
            Err(ConfigError::FieldMissing(_))
        ));
        assert!(matches!(
            config.require_str("database.type"),
            Err(ConfigError::WrongType { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[database", "broken.toml").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(origin, _) if origin == "broken.toml"));
    }
}
