use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Environment variable holding the path of the configuration file.
pub const CONFIG_ENV: &str = "HEFESTO_CONFIG";

/// Builder configuration, read from `hefesto.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Level of the `hefesto` log targets.
    /// Default: info
    pub log_level: Option<String>,

    /// Emit log events as JSON objects instead of plain lines.
    /// Default: false
    pub log_json: Option<bool>,

    /// Log every translated query (and its parameters) at debug level.
    /// Default: false
    pub log_queries: Option<bool>,

    /// Page size used by `page_first`.
    /// Default: 20
    pub default_page_size: Option<u64>,
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_json: Some(false),
            log_queries: Some(false),
            default_page_size: Some(20),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Loads the file named by `HEFESTO_CONFIG`, falling back to defaults when the variable is
    /// unset or the file does not exist.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if Path::new(&path).exists() => {
                debug!("loading configuration from {path}");
                Self::load(path)
            }
            Ok(path) => {
                debug!("configuration file {path} not found, using defaults");
                Ok(Self::default_config())
            }
            Err(_) => Ok(Self::default_config()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn log_json(&self) -> bool {
        self.log_json.unwrap_or(false)
    }

    pub fn log_queries(&self) -> bool {
        self.log_queries.unwrap_or(false)
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size.unwrap_or(20)
    }
}

#[cfg(test)]
fn with_env<F>(vars: Vec<(&str, &str)>, f: F)
where
    F: FnOnce(),
{
    let old_vars: Vec<_> = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();

    for (key, value) in &vars {
        std::env::set_var(key, value);
    }

    f();

    for (key, old_value) in old_vars {
        match old_value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}
