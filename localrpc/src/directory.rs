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

//! The local service directory.
//!
//! Maps entry names (`{block}{/path}`, for example `core/userService`) to the
//! invokers registered by running deployment blocks. The map is stored
//! behind an [`ArcSwap`]: lookups load a snapshot without locking, and every
//! mutation publishes a new map, so a block's services appear and disappear
//! together.

use crate::invoker::Invoker;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

type Entries = HashMap<String, Arc<dyn Invoker>>;

/// Registry of invokers keyed by entry name.
#[derive(Default)]
pub struct ServiceDirectory {
    entries: ArcSwap<Entries>,
}

impl ServiceDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an invoker, replacing any previous one under `name`.
    ///
    /// Returns the replaced invoker.
    pub fn register(
        &self,
        name: impl Into<String>,
        invoker: Arc<dyn Invoker>,
    ) -> Option<Arc<dyn Invoker>> {
        let name = name.into();
        let previous = self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.insert(name.clone(), Arc::clone(&invoker));
            next
        });
        let replaced = previous.get(&name).cloned();
        if replaced.is_some() {
            warn!(entry = %name, "Replaced registered local service invoker");
        } else {
            debug!(entry = %name, "Registered local service invoker");
        }
        replaced
    }

    /// Registers several invokers in one atomic publish.
    pub fn register_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn Invoker>)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        if entries.is_empty() {
            return;
        }
        let previous = self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            for (name, invoker) in &entries {
                next.insert(name.clone(), Arc::clone(invoker));
            }
            next
        });
        for (name, _) in &entries {
            if previous.contains_key(name) {
                warn!(entry = %name, "Replaced registered local service invoker");
            }
        }
        debug!(count = entries.len(), "Registered local service invokers");
    }

    /// Registers several invokers in one atomic publish unless any of them
    /// is already registered.
    ///
    /// On conflict nothing is published and the first conflicting entry name
    /// is returned.
    pub fn try_register_all<I>(&self, entries: I) -> Result<(), String>
    where
        I: IntoIterator<Item = (String, Arc<dyn Invoker>)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut conflict = None;
        self.entries.rcu(|current| {
            conflict = entries
                .iter()
                .find(|(name, _)| current.contains_key(name))
                .map(|(name, _)| name.clone());
            if conflict.is_some() {
                return Arc::clone(current);
            }
            let mut next = Entries::clone(current);
            for (name, invoker) in &entries {
                next.insert(name.clone(), Arc::clone(invoker));
            }
            Arc::new(next)
        });
        match conflict {
            Some(name) => Err(name),
            None => {
                debug!(count = entries.len(), "Registered local service invokers");
                Ok(())
            }
        }
    }

    /// Removes the invoker registered under `name`.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Invoker>> {
        let previous = self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.remove(name);
            next
        });
        let removed = previous.get(name).cloned();
        if removed.is_some() {
            debug!(entry = name, "Unregistered local service invoker");
        }
        removed
    }

    /// Removes several invokers in one atomic publish.
    pub fn unregister_all<S: AsRef<str>>(&self, names: &[S]) {
        if names.is_empty() {
            return;
        }
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            for name in names {
                next.remove(name.as_ref());
            }
            next
        });
        debug!(count = names.len(), "Unregistered local service invokers");
    }

    /// Returns the invoker registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Invoker>> {
        self.entries.load().get(name).cloned()
    }

    /// Returns `true` if an invoker is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.load().contains_key(name)
    }

    /// Returns the registered entry names, sorted.
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered invokers.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

impl fmt::Debug for ServiceDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDirectory")
            .field("entries", &self.entries())
            .finish()
    }
}
