//! Host runtime properties.
//!
//! The host hands a unit a flat string map at initialisation. This module
//! turns that map into a [`ListenerConfig`].
//!
//! # Recognised Keys
//! - `port`, `bufferCapacity`, `stopper`, `idleTimeoutMs`: integers
//! - `target`, `packages`: comma separated lists
//! - `targetUnits`: JSON object, path → component id or
//!   path → `{"unit": id, "methods": [..]}`
//! - `dispatch`: `blocking` | `deferred`
//! - `readyPolicy`: `non-empty` | `zero-ready`
//! - `contentLength`, `codecBodies`: `true` | `false`

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::config::loader::ConfigError;
use crate::config::schema::{DispatchMode, ListenerConfig, ReadyPolicy, UnitBinding};

pub const PROPERTY_PORT: &str = "port";
pub const PROPERTY_TARGET: &str = "target";
pub const PROPERTY_STOPPER: &str = "stopper";
pub const PROPERTY_BUFFER_CAPACITY: &str = "bufferCapacity";
pub const PROPERTY_PACKAGES: &str = "packages";
pub const PROPERTY_TARGET_UNITS: &str = "targetUnits";
pub const PROPERTY_DISPATCH: &str = "dispatch";
pub const PROPERTY_READY_POLICY: &str = "readyPolicy";
pub const PROPERTY_CONTENT_LENGTH: &str = "contentLength";
pub const PROPERTY_CODEC_BODIES: &str = "codecBodies";
pub const PROPERTY_IDLE_TIMEOUT: &str = "idleTimeoutMs";

const DELIMITER: char = ',';

/// Flat key/value configuration supplied by the host runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Property {
                key,
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
        ConfigError::Property {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (key, value) in iter {
            properties.set(key, value);
        }
        properties
    }
}

impl ListenerConfig {
    /// Build a listener configuration from host properties.
    ///
    /// Missing keys take their defaults. The result is not yet validated.
    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        let mut config = ListenerConfig::default();

        if let Some(port) = properties.parse::<u16>(PROPERTY_PORT)? {
            config.port = port;
        }
        if let Some(capacity) = properties.parse::<usize>(PROPERTY_BUFFER_CAPACITY)? {
            config.buffer_capacity = capacity;
        }
        config.stopper = properties.parse::<usize>(PROPERTY_STOPPER)?;
        config.idle_timeout_ms = properties.parse::<u64>(PROPERTY_IDLE_TIMEOUT)?;
        if let Some(content_length) = properties.parse::<bool>(PROPERTY_CONTENT_LENGTH)? {
            config.content_length = content_length;
        }
        if let Some(codec_bodies) = properties.parse::<bool>(PROPERTY_CODEC_BODIES)? {
            config.codec_bodies = codec_bodies;
        }

        if let Some(targets) = properties.get(PROPERTY_TARGET) {
            config.targets = targets
                .split(DELIMITER)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }

        // Whitespace is kept so validation can reject it.
        if let Some(packages) = properties.get(PROPERTY_PACKAGES) {
            config.packages = packages.split(DELIMITER).map(String::from).collect();
        }

        if let Some(raw) = properties.get(PROPERTY_TARGET_UNITS) {
            if !raw.trim().is_empty() {
                config.target_units = serde_json::from_str::<BTreeMap<String, UnitBinding>>(raw)
                    .map_err(ConfigError::TargetUnits)?;
            }
        }

        if let Some(raw) = properties.get(PROPERTY_DISPATCH) {
            config.dispatch = match raw.trim() {
                "blocking" => DispatchMode::Blocking,
                "deferred" => DispatchMode::Deferred,
                other => return Err(Properties::invalid(PROPERTY_DISPATCH, other, "expected blocking or deferred")),
            };
        }

        if let Some(raw) = properties.get(PROPERTY_READY_POLICY) {
            config.ready_policy = match raw.trim() {
                "non-empty" => ReadyPolicy::NonEmpty,
                "zero-ready" => ReadyPolicy::ZeroReady,
                other => return Err(Properties::invalid(PROPERTY_READY_POLICY, other, "expected non-empty or zero-ready")),
            };
        }

        Ok(config)
    }
}
