//! Dotted-key configuration store.
//!
//! Pure lookup over values resolved at construction: the facade stores the
//! normalized view paths and cache directory here, and the wiring closures
//! read them back out. Immutable after construction.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::Error;

/// Immutable configuration values under dotted keys.
pub struct ConfigStore {
    entries: HashMap<String, Value>,
}

impl ConfigStore {
    /// Creates a store from an initial mapping.
    pub fn new(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }

    /// Looks up a raw value.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ConfigKeyNotFound`] for undefined keys.
    pub fn get(&self, key: &str) -> Result<&Value, Error> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::ConfigKeyNotFound(key.to_string()))
    }

    /// Looks up a string value.
    pub fn get_str(&self, key: &str) -> Result<&str, Error> {
        self.get(key)?.as_str().ok_or_else(|| Error::ConfigType {
            key: key.to_string(),
            expected: "a string",
        })
    }

    /// Looks up a single path.
    pub fn get_path(&self, key: &str) -> Result<PathBuf, Error> {
        Ok(PathBuf::from(self.get_str(key)?))
    }

    /// Looks up a list of paths.
    pub fn get_paths(&self, key: &str) -> Result<Vec<PathBuf>, Error> {
        let items = self.get(key)?.as_array().ok_or_else(|| Error::ConfigType {
            key: key.to_string(),
            expected: "an array of paths",
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(PathBuf::from)
                    .ok_or_else(|| Error::ConfigType {
                        key: key.to_string(),
                        expected: "an array of paths",
                    })
            })
            .collect()
    }
}
