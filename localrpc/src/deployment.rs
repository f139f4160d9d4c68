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

//! Deployment block lifecycle.
//!
//! A deployment block groups the services one component of the application
//! exposes. Starting a block publishes all of its invokers to the service
//! directory at once and records the block as started; stopping it removes
//! both again. A block whose initialization fails is recorded as failed,
//! registers nothing, and the captured failure is what callers see when
//! they try to reach one of its services.
//!
//! # Examples
//!
//! ```rust
//! use localrpc::deployment::DeploymentBlock;
//! use localrpc::invocation::{Invocation, InvocationResult};
//! use localrpc::LocalEnvironment;
//!
//! let environment = LocalEnvironment::new();
//! let block = DeploymentBlock::new("core")
//!     .with_service("/ping", |_: Invocation| InvocationResult::Value(Vec::new()))
//!     .start(&environment)
//!     .unwrap();
//!
//! assert!(environment.directory().contains("core/ping"));
//! block.shutdown();
//! assert!(environment.directory().is_empty());
//! ```

use crate::dispatcher::normalize_service_name;
use crate::environment::LocalEnvironment;
use crate::error::CapturedFailure;
use crate::invoker::Invoker;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised when starting a deployment block.
#[derive(Debug, Error)]
pub enum BlockStartError {
    /// A block with the same name is already running.
    #[error("deployment block '{name}' is already running")]
    AlreadyRunning {
        /// Block name
        name: String,
    },

    /// The block declares the same service path twice.
    #[error("deployment block '{name}' declares service '{path}' twice")]
    DuplicateService {
        /// Block name
        name: String,
        /// Normalized service path
        path: String,
    },

    /// A service path is empty.
    #[error("deployment block '{name}' declares a service without a name")]
    UnnamedService {
        /// Block name
        name: String,
    },

    /// Initialization of the block failed.
    #[error("deployment block '{name}' failed to start: {cause}")]
    Failed {
        /// Block name
        name: String,
        /// Captured initialization failure
        #[source]
        cause: CapturedFailure,
    },
}

/// A deployment block that has not been started yet.
pub struct DeploymentBlock {
    name: String,
    context_name: Option<String>,
    services: Vec<(String, Arc<dyn Invoker>)>,
}

impl DeploymentBlock {
    /// Creates a block named `name`.
    ///
    /// The name is the last segment of the connection URL that targets it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context_name: None,
            services: Vec::new(),
        }
    }

    /// Sets the context name the block is deployed under. Defaults to the
    /// block name.
    ///
    /// Directory entries are named `{context_name}{path}`, so callers reach
    /// the block through a connection URL ending with the context name.
    #[must_use]
    pub fn with_context_name(mut self, context_name: impl Into<String>) -> Self {
        self.context_name = Some(context_name.into());
        self
    }

    /// Adds a service at `path`.
    #[must_use]
    pub fn with_service(self, path: impl Into<String>, invoker: impl Invoker + 'static) -> Self {
        self.with_shared_service(path, Arc::new(invoker))
    }

    /// Adds a shared invoker at `path`.
    #[must_use]
    pub fn with_shared_service(mut self, path: impl Into<String>, invoker: Arc<dyn Invoker>) -> Self {
        self.add_service(path, invoker);
        self
    }

    /// Adds a service while the block is being initialized.
    pub fn add_service(&mut self, path: impl Into<String>, invoker: Arc<dyn Invoker>) {
        self.services.push((path.into(), invoker));
    }

    /// Returns the block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts the block.
    pub fn start(self, environment: &LocalEnvironment) -> Result<RunningBlock, BlockStartError> {
        self.start_with(environment, |_| Ok::<(), std::convert::Infallible>(()))
    }

    /// Runs `init` and starts the block if it succeeds.
    ///
    /// `init` may add services. If it fails, the failure is recorded in the
    /// block status directory and nothing is registered.
    pub fn start_with<F, E>(
        mut self,
        environment: &LocalEnvironment,
        init: F,
    ) -> Result<RunningBlock, BlockStartError>
    where
        F: FnOnce(&mut DeploymentBlock) -> Result<(), E>,
        E: StdError + 'static,
    {
        let context_name = self.context_name.clone().unwrap_or_else(|| self.name.clone());
        if environment
            .blocks()
            .get(&self.name)
            .is_some_and(|status| status.is_started())
        {
            return Err(BlockStartError::AlreadyRunning { name: self.name });
        }

        if let Err(err) = init(&mut self) {
            let cause = CapturedFailure::capture(&err);
            if !environment
                .blocks()
                .record_failed(&self.name, &context_name, cause.clone())
            {
                return Err(BlockStartError::AlreadyRunning { name: self.name });
            }
            return Err(BlockStartError::Failed {
                name: self.name,
                cause,
            });
        }

        // Entries go live before the status; `stop` reverses the order.
        let entries = self.entries()?;
        let entry_names: Vec<String> = entries.iter().map(|(entry, _)| entry.clone()).collect();
        if environment.directory().try_register_all(entries).is_err() {
            return Err(BlockStartError::AlreadyRunning { name: self.name });
        }
        if !environment.blocks().try_record_started(&self.name, &context_name) {
            environment.directory().unregister_all(&entry_names);
            return Err(BlockStartError::AlreadyRunning { name: self.name });
        }

        info!(
            block = %self.name,
            context = %context_name,
            services = entry_names.len(),
            "Started deployment block"
        );
        Ok(RunningBlock {
            name: self.name,
            context_name,
            entries: entry_names,
            environment: environment.clone(),
            stopped: false,
        })
    }

    fn entries(&self) -> Result<Vec<(String, Arc<dyn Invoker>)>, BlockStartError> {
        let context_name = self.context_name.as_deref().unwrap_or(&self.name);
        let mut entries: Vec<(String, Arc<dyn Invoker>)> = Vec::with_capacity(self.services.len());
        for (path, invoker) in &self.services {
            let path = normalize_service_name(path).map_err(|_| BlockStartError::UnnamedService {
                name: self.name.clone(),
            })?;
            let entry = format!("{}{}", context_name, path);
            if entries.iter().any(|(existing, _)| *existing == entry) {
                return Err(BlockStartError::DuplicateService {
                    name: self.name.clone(),
                    path,
                });
            }
            entries.push((entry, Arc::clone(invoker)));
        }
        Ok(entries)
    }
}

impl fmt::Debug for DeploymentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentBlock")
            .field("name", &self.name)
            .field("context_name", &self.context_name)
            .field(
                "services",
                &self.services.iter().map(|(path, _)| path).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A started deployment block.
///
/// Dropping the handle stops the block.
pub struct RunningBlock {
    name: String,
    context_name: String,
    entries: Vec<String>,
    environment: LocalEnvironment,
    stopped: bool,
}

impl RunningBlock {
    /// Returns the block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context name.
    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    /// Returns the directory entries the block registered.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Returns the invoker the block registered at `path`.
    pub fn invoker(&self, path: &str) -> Option<Arc<dyn Invoker>> {
        let path = normalize_service_name(path).ok()?;
        let entry = format!("{}{}", self.context_name, path);
        if !self.entries.contains(&entry) {
            return None;
        }
        self.environment.directory().lookup(&entry)
    }

    /// Stops the block, unregistering its services and clearing its status.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.environment.blocks().remove(&self.name);
        self.environment.directory().unregister_all(&self.entries);
        info!(block = %self.name, "Stopped deployment block");
    }
}

impl Drop for RunningBlock {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for RunningBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningBlock")
            .field("name", &self.name)
            .field("context_name", &self.context_name)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
