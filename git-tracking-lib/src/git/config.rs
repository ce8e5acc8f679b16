use std::fmt::Display;

use tracing::instrument;

use crate::git::repo::{Error, Result};

/// Wrapper around the config values stored on disk for Git.
pub struct Config {
    inner: git2::Config,
}

impl From<git2::Config> for Config {
    fn from(config: git2::Config) -> Self {
        Config { inner: config }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Git repository config>")
    }
}

#[derive(Debug)]
enum ConfigValueInner {
    String(String),
    Bool(bool),
}

/// A wrapper around a possible value that can be set for a config key.
#[derive(Debug)]
pub struct ConfigValue {
    inner: ConfigValueInner,
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> ConfigValue {
        ConfigValue {
            inner: ConfigValueInner::Bool(value),
        }
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> ConfigValue {
        ConfigValue {
            inner: ConfigValueInner::String(value),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> ConfigValue {
        ConfigValue {
            inner: ConfigValueInner::String(value.to_string()),
        }
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ConfigValueInner::String(value) => write!(f, "{value}"),
            ConfigValueInner::Bool(value) => write!(f, "{value:?}"),
        }
    }
}

/// Trait used to make `Config::get` able to return multiple types.
pub trait GetConfigValue<V> {
    /// Get the given type of value from the config object.
    fn get_from_config(config: &Config, key: &str) -> Result<Option<V>>;
}

impl GetConfigValue<String> for String {
    fn get_from_config(config: &Config, key: &str) -> Result<Option<String>> {
        match config.inner.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(err) => Err(Error::ReadConfigKey {
                source: err,
                key: key.to_owned(),
            }),
        }
    }
}

impl GetConfigValue<bool> for bool {
    fn get_from_config(config: &Config, key: &str) -> Result<Option<bool>> {
        match config.inner.get_bool(key) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(err) => Err(Error::ReadConfigKey {
                source: err,
                key: key.to_owned(),
            }),
        }
    }
}

impl Config {
    /// Get a config key of one of various possible types. Returns `None` if
    /// the key is not set at any level.
    #[instrument]
    pub fn get<V: GetConfigValue<V>, S: AsRef<str> + std::fmt::Debug>(
        &self,
        key: S,
    ) -> Result<Option<V>> {
        V::get_from_config(self, key.as_ref())
    }

    /// Same as `get`, but uses a default value if the config key doesn't exist.
    #[instrument]
    pub fn get_or<V: GetConfigValue<V> + std::fmt::Debug, S: AsRef<str> + std::fmt::Debug>(
        &self,
        key: S,
        default: V,
    ) -> Result<V> {
        let result = self.get(key)?;
        Ok(result.unwrap_or(default))
    }

    /// Set the given config key to the given value. The value is written to
    /// the repository-local configuration file.
    #[instrument]
    pub fn set(
        &mut self,
        key: impl AsRef<str> + std::fmt::Debug,
        value: impl Into<ConfigValue> + std::fmt::Debug,
    ) -> Result<()> {
        let key = key.as_ref();
        let value = value.into();
        let result = match &value.inner {
            ConfigValueInner::String(value) => self.inner.set_str(key, value),
            ConfigValueInner::Bool(value) => self.inner.set_bool(key, *value),
        };
        result.map_err(|err| Error::WriteConfigKey {
            source: err,
            key: key.to_owned(),
            value: value.to_string(),
        })
    }

    /// Remove the given key from the configuration. Removing a key which isn't
    /// set is not an error.
    #[instrument]
    pub fn remove(&mut self, key: impl AsRef<str> + std::fmt::Debug) -> Result<()> {
        let key = key.as_ref();
        match self.inner.remove(key) {
            Ok(()) => Ok(()),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(err) => Err(Error::RemoveConfigKey {
                source: err,
                key: key.to_owned(),
            }),
        }
    }
}
