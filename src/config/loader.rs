use std::{env, fs, path::Path, path::PathBuf};

use crate::errors::ConfigError;

use super::Config;

/// Prefix of environment overrides: `XO_SERVER__DATABASE__FILE` sets `database.file`.
pub const ENV_PREFIX: &str = "XO_SERVER__";

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "XO_SERVER_CONFIG";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env_overrides: bool,
}

impl ConfigLoader {
    /// Loader using `XO_SERVER_CONFIG` or the per-user default path
    pub fn new() -> Self {
        Self {
            path: None,
            env_overrides: true,
        }
    }

    /// Loader reading an explicit file, which must exist
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            env_overrides: true,
        }
    }

    /// Skip `XO_SERVER__*` overrides (for testing)
    pub fn without_env(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Load defaults, then the file, then environment overrides.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let mut config = Config::with_defaults();

        let explicit = self
            .path
            .clone()
            .or_else(|| env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        match explicit {
            Some(path) => config.merge(read_config_file(&path)?),
            None => {
                let path = default_config_path();
                if path.exists() {
                    config.merge(read_config_file(&path)?);
                } else {
                    tracing::info!(
                        path = %path.display(),
                        "no configuration file found, using defaults"
                    );
                }
            }
        }

        if self.env_overrides {
            let applied = apply_env_overrides(&mut config, env::vars());
            if applied > 0 {
                tracing::debug!(count = applied, "applied environment overrides");
            }
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user configuration file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("xo-server")
        .join(CONFIG_FILE_NAME)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let shown = path.display().to_string();
    let content =
        fs::read_to_string(path).map_err(|e| ConfigError::FileRead(shown.clone(), e))?;
    let config = Config::from_toml_str(&content, &shown)?;
    tracing::info!(path = %shown, "configuration loaded");
    Ok(config)
}

/// Apply `XO_SERVER__SECTION__KEY=value` pairs; returns how many were applied.
pub fn apply_env_overrides<I>(config: &mut Config, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let key = rest
            .split("__")
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        config.set(&key, value);
        applied += 1;
    }
    applied
}
