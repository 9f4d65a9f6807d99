//! Raw task configuration.
//!
//! [`TaskConfig`] wraps the flat string-keyed property map the host runtime
//! hands to a task at start. It offers typed accessors; parsing it into the
//! immutable [`TaskSetting`](crate::setting::TaskSetting) happens once,
//! before any other resource is allocated.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ConnectorError;

/// Flat string-keyed configuration as received from the host runtime.
#[derive(Debug, Clone, Default)]
pub struct TaskConfig {
    properties: HashMap<String, String>,
}

impl TaskConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration from an existing property map.
    #[must_use]
    pub fn with_properties(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    /// Sets a property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Gets a property value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Gets a required property value.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::MissingConfig`] if the key is absent.
    pub fn require(&self, key: &str) -> Result<&str, ConnectorError> {
        self.get(key)
            .ok_or_else(|| ConnectorError::MissingConfig(key.to_string()))
    }

    /// Gets a property parsed into `T`, or `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConfigurationError`] naming the key if the
    /// value is present but does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConnectorError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                ConnectorError::ConfigurationError(format!(
                    "invalid value '{raw}' for key '{key}'"
                ))
            }),
        }
    }

    /// Returns the underlying property map.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}
