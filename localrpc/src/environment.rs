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

//! The process-local invocation environment.
//!
//! A [`LocalEnvironment`] bundles everything a call needs besides its
//! arguments: the service directory, the block statuses, the property source
//! and the metrics. [`LocalEnvironment::global`] is the environment shared by
//! the whole process; tests and embedded applications can build isolated
//! ones. Cloning an environment shares its state.

use crate::config::{EnvProperties, PropertySource};
use crate::directory::ServiceDirectory;
use crate::observability::InvocationMetrics;
use crate::status::BlockStatusDirectory;
use std::fmt;
use std::sync::{Arc, LazyLock};

static GLOBAL: LazyLock<LocalEnvironment> = LazyLock::new(LocalEnvironment::new);

/// Shared state of local service invocation.
#[derive(Clone)]
pub struct LocalEnvironment {
    directory: Arc<ServiceDirectory>,
    blocks: Arc<BlockStatusDirectory>,
    properties: Arc<dyn PropertySource>,
    metrics: Arc<InvocationMetrics>,
}

impl LocalEnvironment {
    /// Creates an isolated environment reading properties from environment
    /// variables.
    pub fn new() -> Self {
        Self {
            directory: Arc::new(ServiceDirectory::new()),
            blocks: Arc::new(BlockStatusDirectory::new()),
            properties: Arc::new(EnvProperties::new()),
            metrics: Arc::new(InvocationMetrics::new()),
        }
    }

    /// Returns the process-wide environment.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Replaces the property source.
    ///
    /// The directory, statuses and metrics stay shared with `self`.
    #[must_use]
    pub fn with_properties(self, properties: impl PropertySource + 'static) -> Self {
        self.with_property_source(Arc::new(properties))
    }

    /// Replaces the property source with a shared one.
    #[must_use]
    pub fn with_property_source(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = properties;
        self
    }

    /// Returns the service directory.
    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    /// Returns the block status directory.
    pub fn blocks(&self) -> &BlockStatusDirectory {
        &self.blocks
    }

    /// Returns the property source.
    pub fn properties(&self) -> &dyn PropertySource {
        self.properties.as_ref()
    }

    /// Returns the invocation metrics.
    pub fn metrics(&self) -> &InvocationMetrics {
        &self.metrics
    }
}

impl Default for LocalEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEnvironment")
            .field("directory", &self.directory)
            .field("blocks", &self.blocks.block_names())
            .finish_non_exhaustive()
    }
}
