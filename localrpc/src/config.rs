//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Configuration properties.
//!
//! The invocation layer reads a single property,
//! [`CONNECTION_URL_LIST`], whose last path segment names the deployment
//! block that hosts the target services. Properties are read through a
//! [`PropertySource`] so that embedding applications can supply their own
//! configuration; [`EnvProperties`] reads process environment variables and
//! [`StaticProperties`] holds an in-memory map.
//!
//! # Examples
//!
//! ```rust
//! use localrpc::config::{CONNECTION_URL_LIST, StaticProperties, target_block_name};
//!
//! let properties = StaticProperties::new()
//!     .with_property(CONNECTION_URL_LIST, "http://localhost:8080/core");
//! assert_eq!(target_block_name(&properties).unwrap(), "core");
//! ```

use crate::error::InvocationError;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the property holding the connection URL list.
pub const CONNECTION_URL_LIST: &str = "localrpc.connectionUrlList";

/// A source of configuration properties.
pub trait PropertySource: Send + Sync {
    /// Returns the value of property `name`, if defined.
    fn property(&self, name: &str) -> Option<String>;
}

/// Reads properties from environment variables.
///
/// A property name maps to a variable name by upper-casing it, turning `.`
/// into `_` and splitting camel case with `_`, so
/// `localrpc.connectionUrlList` is read from `LOCALRPC_CONNECTION_URL_LIST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProperties;

impl EnvProperties {
    /// Creates an environment property source.
    pub const fn new() -> Self {
        Self
    }

    /// Returns the environment variable that holds property `name`.
    pub fn variable_name(name: &str) -> String {
        let mut variable = String::with_capacity(name.len() + 4);
        let mut previous_lower = false;
        for c in name.chars() {
            if c == '.' || c == '-' {
                variable.push('_');
                previous_lower = false;
            } else if c.is_ascii_uppercase() && previous_lower {
                variable.push('_');
                variable.push(c);
                previous_lower = false;
            } else {
                variable.push(c.to_ascii_uppercase());
                previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            }
        }
        variable
    }
}

impl PropertySource for EnvProperties {
    fn property(&self, name: &str) -> Option<String> {
        std::env::var(Self::variable_name(name)).ok()
    }
}

/// In-memory properties.
///
/// Values can be changed while proxies are in use; every call reads the
/// current value.
#[derive(Debug, Default)]
pub struct StaticProperties {
    values: ArcSwap<HashMap<String, String>>,
}

impl StaticProperties {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.values.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.clone(), value.clone());
            next
        });
    }

    /// Removes a property.
    pub fn remove(&self, name: &str) {
        self.values.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(name);
            next
        });
    }
}

impl PropertySource for StaticProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.values.load().get(name).cloned()
    }
}

impl<P: PropertySource + ?Sized> PropertySource for Arc<P> {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

/// Extracts the block name from a connection URL list.
///
/// The block name is the last `/`-separated segment, ignoring trailing
/// slashes. A value without a usable last segment is a configuration error.
pub fn block_name(url_list: &str) -> Result<&str, InvocationError> {
    let trimmed = url_list.trim().trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name.ends_with(':') {
        return Err(InvocationError::configuration(format!(
            "Property {} does not end with a deployment block name: '{}'",
            CONNECTION_URL_LIST, url_list
        )));
    }
    Ok(name)
}

/// Reads [`CONNECTION_URL_LIST`] and returns the target block name.
pub fn target_block_name(properties: &dyn PropertySource) -> Result<String, InvocationError> {
    let url_list = properties.property(CONNECTION_URL_LIST).ok_or_else(|| {
        InvocationError::configuration(format!("Property {} not defined", CONNECTION_URL_LIST))
    })?;
    block_name(&url_list).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    #[test]
    fn test_block_name() {
        assert_eq!(block_name("http://localhost:8080/core").unwrap(), "core");
        assert_eq!(block_name("http://localhost:8080/app-core/").unwrap(), "app-core");
        assert_eq!(block_name("core").unwrap(), "core");
    }

    #[test]
    fn test_block_name_empty() {
        assert_eq!(block_name("").unwrap_err().kind(), FailureKind::Configuration);
        assert!(block_name("/").is_err());
        assert!(block_name("http://").is_err());
    }

    #[test]
    fn test_missing_property() {
        let error = target_block_name(&StaticProperties::new()).unwrap_err();
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert_eq!(
            error.to_string(),
            "configuration error: Property localrpc.connectionUrlList not defined"
        );
    }

    #[test]
    fn test_static_properties_update() {
        let properties = StaticProperties::new().with_property(CONNECTION_URL_LIST, "http://h/a");
        assert_eq!(target_block_name(&properties).unwrap(), "a");
        properties.set(CONNECTION_URL_LIST, "http://h/b");
        assert_eq!(target_block_name(&properties).unwrap(), "b");
        properties.remove(CONNECTION_URL_LIST);
        assert!(properties.property(CONNECTION_URL_LIST).is_none());
    }

    #[test]
    fn test_env_variable_name() {
        assert_eq!(
            EnvProperties::variable_name(CONNECTION_URL_LIST),
            "LOCALRPC_CONNECTION_URL_LIST"
        );
        assert_eq!(EnvProperties::variable_name("a.b2Cd"), "A_B2_CD");
    }
}
