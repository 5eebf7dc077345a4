//! Registration configuration handed in by the gateway
//!
//! Configuration parsing (files, CLI flags, environment) happens in the
//! surrounding system; this type arrives fully populated and is
//! read-only to the adapter.

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry endpoint configuration plus backend extension properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// Comma-separated registry server URLs
    pub server_lists: String,

    /// Backend-specific extension properties (namespace, lease timing
    /// overrides, ...). Pass-through; not validated here.
    #[serde(default)]
    pub props: HashMap<String, String>,
}

impl RegisterConfig {
    /// Create a config for the given endpoint list.
    pub fn new(server_lists: impl Into<String>) -> Self {
        Self {
            server_lists: server_lists.into(),
            props: HashMap::new(),
        }
    }

    /// Attach a backend extension property.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// The endpoint list, split literally on `,`.
    ///
    /// Whitespace is not trimmed: `"http://a, http://b"` yields a second
    /// URL with a leading space. Known strictness point, kept on purpose
    /// so behavior matches what the endpoint string literally says.
    pub fn server_urls(&self) -> Vec<String> {
        if self.server_lists.is_empty() {
            return Vec::new();
        }
        self.server_lists.split(',').map(str::to_string).collect()
    }

    /// Look up a backend extension property.
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Look up a numeric extension property.
    ///
    /// Absent keys are `Ok(None)`; present-but-unparsable values are a
    /// configuration error rather than a silent fallback.
    pub fn prop_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.props.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
                RegistryError::Configuration(format!(
                    "property `{}` is not a number: `{}`",
                    key, raw
                ))
            }),
        }
    }
}
